//! Spoken alarm announcements
//!
//! When an alarm rings, a short notification is synthesized and played
//! through a dedicated short-lived output stream, independent of any live
//! session's playback queue. Afterward the UI is signaled back to idle —
//! immediately if synthesis fails.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::alarm::AlarmRing;
use crate::audio::{codec, play_once_blocking};
use crate::services::SpeechService;
use crate::session::events::UiEvent;
use crate::session::state::MochiState;

/// Spawn the task that speaks each alarm ring
pub fn spawn_announcer(
    mut rings: mpsc::UnboundedReceiver<AlarmRing>,
    speech: Arc<SpeechService>,
    voice: String,
    sample_rate: u32,
    ui: broadcast::Sender<UiEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ring) = rings.recv().await {
            tracing::info!(id = ring.id, label = %ring.label, "alarm ringing");
            announce(&speech, &voice, sample_rate, &ring).await;
            let _ = ui.send(UiEvent::State {
                state: MochiState::Idle,
                status: None,
            });
        }
    })
}

async fn announce(speech: &SpeechService, voice: &str, sample_rate: u32, ring: &AlarmRing) {
    let text = format!("Tới giờ rồi! {}", ring.label);

    let audio = match speech.synthesize(&text, voice).await {
        Ok(audio) => audio,
        Err(e) => {
            tracing::warn!(error = %e, "alarm announcement synthesis failed");
            return;
        }
    };

    let samples = codec::decode_frame(&audio);
    let played = tokio::task::spawn_blocking(move || play_once_blocking(samples, sample_rate)).await;

    match played {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "alarm announcement playback failed"),
        Err(e) => tracing::warn!(error = %e, "alarm announcement task panicked"),
    }
}
