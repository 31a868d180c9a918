//! Live session orchestration
//!
//! [`Companion`] is the interface the UI layer talks to: it starts and stops
//! live sessions, forwards explicit wake-ups, and publishes every observable
//! change on one broadcast channel. Each open session is driven by its own
//! event loop owning the duplex connection, the audio pipeline, and all
//! per-session state.

pub mod events;
pub mod state;
pub mod transport;
pub mod wire;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::alarm::{AlarmScheduler, announcer};
use crate::audio::capture::{CaptureStream, spawn_forward_task};
use crate::audio::{PlaybackQueue, codec};
use crate::config::Config;
use crate::profile::UserProfile;
use crate::prompt::build_system_instruction;
use crate::services::{QuoteService, SpeechService, TextService, WeatherService};
use crate::tools::{SEARCH_INTERNET, ToolDispatcher};
use crate::{Error, Result};

use events::{HistoryEntry, ServerEvent, Speaker, TranscriptionFragment, UiEvent};
use state::{MochiState, SessionContext};
use transport::{GeminiLiveConnector, LiveConnector, LiveTransport, SessionSetup};

/// UI event channel depth
const UI_CHANNEL_CAPACITY: usize = 64;

/// How long `stop_session` waits for the runner to acknowledge teardown
const STOP_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Commands from the UI into a running session
enum Command {
    /// Tear everything down; ack when done
    Stop(oneshot::Sender<()>),
    /// Explicit wake-up while suspended
    WakeUp,
    /// Post-turn settle delay elapsed
    Settle { generation: u64 },
}

struct ActiveSession {
    cmd_tx: mpsc::UnboundedSender<Command>,
    runner: tokio::task::JoinHandle<()>,
}

/// The Mochi companion core
///
/// Construct once per process, from within a tokio runtime. At most one live
/// session is open at a time; the alarm scheduler and the weather/quote
/// caches outlive individual sessions.
pub struct Companion {
    config: Config,
    connector: Arc<dyn LiveConnector>,
    scheduler: Arc<AlarmScheduler>,
    dispatcher: Arc<ToolDispatcher>,
    weather: WeatherService,
    quotes: QuoteService,
    ui_tx: broadcast::Sender<UiEvent>,
    active: tokio::sync::Mutex<Option<ActiveSession>>,
    generation: AtomicU64,
    announcer: tokio::task::JoinHandle<()>,
}

impl Companion {
    /// Create a companion talking to the hosted live endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the service configuration is incomplete
    pub fn new(config: Config) -> Result<Self> {
        let connector: Arc<dyn LiveConnector> =
            Arc::new(GeminiLiveConnector::new(&config.services)?);
        Self::with_connector(config, connector)
    }

    /// Create a companion with a custom live connector.
    ///
    /// The seam exists for test harnesses and alternative backends; all
    /// session semantics stay identical.
    ///
    /// # Errors
    ///
    /// Returns error if the service configuration is incomplete
    pub fn with_connector(config: Config, connector: Arc<dyn LiveConnector>) -> Result<Self> {
        let text = Arc::new(TextService::new(&config.services)?);
        let speech = Arc::new(SpeechService::new(&config.services)?);

        let (scheduler, rings) = AlarmScheduler::new();
        let scheduler = Arc::new(scheduler);

        let (ui_tx, _) = broadcast::channel(UI_CHANNEL_CAPACITY);

        let announcer = announcer::spawn_announcer(
            rings,
            speech,
            config.voice.alarm_voice.clone(),
            config.voice.playback_sample_rate,
            ui_tx.clone(),
        );

        let dispatcher = Arc::new(ToolDispatcher::new(
            Arc::clone(&text),
            Arc::clone(&scheduler),
        ));

        Ok(Self {
            weather: WeatherService::new(Arc::clone(&text)),
            quotes: QuoteService::new(text),
            config,
            connector,
            scheduler,
            dispatcher,
            ui_tx,
            active: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
            announcer,
        })
    }

    /// Subscribe to state, history, and transcription updates
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.ui_tx.subscribe()
    }

    /// The process-wide alarm scheduler
    #[must_use]
    pub fn alarms(&self) -> &AlarmScheduler {
        &self.scheduler
    }

    /// Weather lookups for the ambient display
    #[must_use]
    pub fn weather(&self) -> &WeatherService {
        &self.weather
    }

    /// Quote lookups for the ambient display
    #[must_use]
    pub fn quotes(&self) -> &QuoteService {
        &self.quotes
    }

    /// Start a live session for a user profile.
    ///
    /// Acquires the microphone, opens the duplex connection, and starts the
    /// capture and playback pipelines. Publishes LOADING while acquiring and
    /// LISTENING once open; any acquisition failure publishes ERROR, tears
    /// down whatever was acquired, and settles back to IDLE.
    ///
    /// # Errors
    ///
    /// [`Error::SessionActive`] if a session is already open; otherwise the
    /// acquisition failure.
    pub async fn start_session(&self, profile: &UserProfile) -> Result<()> {
        let mut slot = self.active.lock().await;
        if let Some(session) = slot.as_ref() {
            if session.runner.is_finished() {
                *slot = None;
            } else {
                return Err(Error::SessionActive);
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit_state(MochiState::Loading, Some("Đang kết nối...".to_string()));

        let voice = &self.config.voice;
        let mut capture = match CaptureStream::open(voice.capture_sample_rate, voice.chunk_size) {
            Ok(capture) => capture,
            Err(e) => {
                self.fail_start(&e);
                return Err(e);
            }
        };

        let setup = SessionSetup {
            model: self.config.services.live_model.clone(),
            system_instruction: build_system_instruction(profile),
            tool_declarations: ToolDispatcher::declarations(),
        };
        let (live, events_rx) = match self.connector.connect(setup).await {
            Ok(opened) => opened,
            Err(e) => {
                capture.stop();
                self.fail_start(&e);
                return Err(e);
            }
        };

        let mut playback = PlaybackQueue::new(voice.playback_sample_rate);
        if let Err(e) = playback.open_output() {
            live.close().await;
            capture.stop();
            self.fail_start(&e);
            return Err(e);
        }

        let ctx = SessionContext::new(generation);
        tracing::info!(session = %ctx.id, generation, "live session started");

        let chunks = capture
            .take_chunks()
            .ok_or_else(|| Error::Session("capture chunks already taken".to_string()))?;
        let forward = spawn_forward_task(chunks, Arc::clone(&ctx.speaking), Arc::clone(&live));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let runner = SessionRunner {
            ctx,
            transport: live,
            playback,
            capture: Some(capture),
            forward: Some(forward),
            dispatcher: Arc::clone(&self.dispatcher),
            ui: self.ui_tx.clone(),
            cmd_tx: cmd_tx.clone(),
            settle_delay: Duration::from_millis(voice.settle_delay_ms),
            wake_phrases: normalized(&voice.wake_phrases),
            farewell_phrases: normalized(&voice.farewell_phrases),
            torn_down: false,
        };

        let handle = tokio::spawn(runner.run(events_rx, cmd_rx));
        *slot = Some(ActiveSession {
            cmd_tx,
            runner: handle,
        });

        self.emit_history_reset();
        self.emit_state(MochiState::Listening, None);
        Ok(())
    }

    /// Stop the live session. No-op when none is open; idempotent.
    pub async fn stop_session(&self) {
        let mut slot = self.active.lock().await;
        let Some(session) = slot.take() else {
            return;
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if session.cmd_tx.send(Command::Stop(ack_tx)).is_ok() {
            let _ = tokio::time::timeout(STOP_ACK_TIMEOUT, ack_rx).await;
        }
        session.runner.abort();
        tracing::info!("live session stopped");
    }

    /// Explicit wake-up while Mochi sleeps conversationally
    pub async fn wake_up(&self) {
        let slot = self.active.lock().await;
        if let Some(session) = slot.as_ref() {
            let _ = session.cmd_tx.send(Command::WakeUp);
        }
    }

    fn fail_start(&self, error: &Error) {
        tracing::error!(error = %error, "session start failed");
        self.emit_state(MochiState::Error, Some(error.status_text()));
        self.emit_state(MochiState::Idle, None);
    }

    fn emit_state(&self, state: MochiState, status: Option<String>) {
        let _ = self.ui_tx.send(UiEvent::State { state, status });
    }

    fn emit_history_reset(&self) {
        let _ = self.ui_tx.send(UiEvent::History(Vec::new()));
        let _ = self.ui_tx.send(UiEvent::Transcription(None));
    }
}

impl Drop for Companion {
    fn drop(&mut self) {
        self.announcer.abort();
    }
}

fn normalized(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|p| p.to_lowercase().trim().to_string())
        .collect()
}

/// How a session ended
enum SessionEnd {
    /// Explicit stop; carries the ack
    Stopped(oneshot::Sender<()>),
    /// Fatal error with a user-facing status
    Fatal(String),
    /// Connection closed with a user-facing status
    Closed(String),
}

/// Event loop for one live session
struct SessionRunner {
    ctx: SessionContext,
    transport: Arc<dyn LiveTransport>,
    playback: PlaybackQueue,
    capture: Option<CaptureStream>,
    forward: Option<tokio::task::JoinHandle<()>>,
    dispatcher: Arc<ToolDispatcher>,
    ui: broadcast::Sender<UiEvent>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    settle_delay: Duration,
    wake_phrases: Vec<String>,
    farewell_phrases: Vec<String>,
    torn_down: bool,
}

impl SessionRunner {
    /// Drive the session until stop, fatal error, or remote close.
    ///
    /// Events are handled to completion one at a time; there is no
    /// concurrent mutation of session state.
    async fn run(
        mut self,
        mut events_rx: mpsc::Receiver<ServerEvent>,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    ) {
        let end = loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(event) => {
                        if let Some(end) = self.handle_server_event(event).await {
                            break end;
                        }
                    }
                    None => break SessionEnd::Closed("Phiên trò chuyện đã kết thúc".to_string()),
                },
                command = cmd_rx.recv() => match command {
                    Some(Command::Stop(ack)) => break SessionEnd::Stopped(ack),
                    Some(Command::WakeUp) => self.on_wake_up(),
                    Some(Command::Settle { generation }) => self.on_settle(generation),
                    None => break SessionEnd::Closed("Phiên trò chuyện đã kết thúc".to_string()),
                },
            }
        };

        match end {
            SessionEnd::Stopped(ack) => {
                self.teardown().await;
                self.emit_state(MochiState::Idle, None);
                let _ = ack.send(());
            }
            SessionEnd::Fatal(status) => {
                self.emit_state(MochiState::Error, Some(status));
                self.teardown().await;
                self.emit_state(MochiState::Idle, None);
            }
            SessionEnd::Closed(status) => {
                self.teardown().await;
                self.emit_state(MochiState::Idle, Some(status));
            }
        }
    }

    /// Apply one inbound event; returns how the session ends, if it does
    async fn handle_server_event(&mut self, event: ServerEvent) -> Option<SessionEnd> {
        match event {
            ServerEvent::AudioDelta(bytes) => {
                self.on_audio_delta(&bytes);
                None
            }
            ServerEvent::InputTranscription(text) => {
                self.on_input_transcription(&text);
                None
            }
            ServerEvent::OutputTranscription(text) => {
                self.on_output_transcription(&text);
                None
            }
            ServerEvent::ToolCall(calls) => {
                self.on_tool_call(&calls).await;
                None
            }
            ServerEvent::Interrupted => {
                self.on_interrupted();
                None
            }
            ServerEvent::TurnComplete => {
                self.on_turn_complete();
                None
            }
            ServerEvent::Error(message) => {
                tracing::error!(session = %self.ctx.id, error = %message, "session error");
                Some(SessionEnd::Fatal(Error::Transport(message).status_text()))
            }
            ServerEvent::Closed(reason) => {
                tracing::info!(session = %self.ctx.id, reason = %reason, "session closed");
                self.ctx.open = false;
                Some(SessionEnd::Closed("Phiên trò chuyện đã kết thúc".to_string()))
            }
        }
    }

    /// Inbound assistant audio: start speaking and queue for gapless playback
    fn on_audio_delta(&mut self, bytes: &[u8]) {
        if self.ctx.is_suspended() {
            return;
        }

        if !self.ctx.is_speaking() {
            self.emit_transcription(None);
            self.ctx.set_speaking(true);
            self.emit_state(MochiState::Speaking, None);
        }

        let samples = codec::decode_frame(bytes);
        self.playback.enqueue(samples);
    }

    /// Incremental user transcription: publish, or scan for the wake phrase
    fn on_input_transcription(&mut self, text: &str) {
        self.ctx.input_acc.push_str(text);

        if self.ctx.is_suspended() {
            let heard = self.ctx.input_acc.to_lowercase();
            if self.wake_phrases.iter().any(|p| heard.contains(p)) {
                tracing::info!(session = %self.ctx.id, "wake phrase detected");
                self.ctx.input_acc.clear();
                self.wake();
            }
            return;
        }

        self.emit_transcription(Some(TranscriptionFragment {
            speaker: Speaker::User,
            text: self.ctx.input_acc.clone(),
        }));
    }

    /// Incremental assistant transcription: publish unless suspended
    fn on_output_transcription(&mut self, text: &str) {
        if self.ctx.is_suspended() {
            return;
        }

        self.ctx.output_acc.push_str(text);
        self.emit_transcription(Some(TranscriptionFragment {
            speaker: Speaker::Assistant,
            text: self.ctx.output_acc.clone(),
        }));
    }

    /// Dispatch a tool-call batch; every call gets exactly one response
    async fn on_tool_call(&mut self, calls: &[events::ToolCallRequest]) {
        for call in calls {
            if call.name == SEARCH_INTERNET {
                self.emit_state(
                    MochiState::Thinking,
                    Some("Mochi đang tìm kiếm...".to_string()),
                );
            }

            let reply = self.dispatcher.dispatch(call).await;
            if reply.request_deep_sleep {
                self.ctx.deep_sleep_requested = true;
            }

            if let Err(e) = self
                .transport
                .send_tool_response(&call.id, &call.name, &reply.response)
                .await
            {
                tracing::warn!(session = %self.ctx.id, error = %e, "tool response not delivered");
            }
        }
    }

    /// Barge-in: discard all audio, clear transcriptions, back to listening
    fn on_interrupted(&mut self) {
        tracing::debug!(session = %self.ctx.id, "interrupted");
        self.playback.stop_all();
        self.ctx.input_acc.clear();
        self.ctx.output_acc.clear();
        self.ctx.set_speaking(false);
        self.emit_transcription(None);

        if self.ctx.open {
            self.emit_state(MochiState::Listening, None);
        }
    }

    /// Finalize the turn, then: deep sleep > farewell > settle-and-listen
    fn on_turn_complete(&mut self) {
        let user_text = self.ctx.input_acc.trim().to_lowercase();
        let assistant_text = self.ctx.output_acc.trim().to_string();

        let mut changed = false;
        if !user_text.is_empty() {
            self.ctx.history.push(HistoryEntry {
                speaker: Speaker::User,
                text: user_text.clone(),
            });
            changed = true;
        }
        if !assistant_text.is_empty() {
            self.ctx.history.push(HistoryEntry {
                speaker: Speaker::Assistant,
                text: assistant_text.clone(),
            });
            changed = true;
        }
        if changed {
            let _ = self.ui.send(UiEvent::History(self.ctx.history.clone()));
        }

        self.ctx.input_acc.clear();
        self.ctx.output_acc.clear();
        self.ctx.set_speaking(false);

        if self.ctx.deep_sleep_requested {
            self.ctx.deep_sleep_requested = false;
            self.emit_state(
                MochiState::EnteringDeepSleep,
                Some("Mochi chuyển sang chế độ ngủ sâu".to_string()),
            );
            return;
        }

        if self.farewell_phrases.iter().any(|p| user_text.contains(p)) {
            tracing::info!(session = %self.ctx.id, "farewell detected, suspending");
            self.ctx.set_suspended(true);
            self.emit_transcription(None);
            let wake = self
                .wake_phrases
                .first()
                .cloned()
                .unwrap_or_else(|| "mochi ơi".to_string());
            self.emit_state(
                MochiState::Sleeping,
                Some(format!("Mochi đang ngủ. Nói \"{wake}\" để đánh thức nhé!")),
            );
            return;
        }

        if !assistant_text.is_empty() {
            self.emit_state(MochiState::Idle, None);
            let cmd_tx = self.cmd_tx.clone();
            let generation = self.ctx.generation;
            let delay = self.settle_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = cmd_tx.send(Command::Settle { generation });
            });
        }
    }

    /// Post-turn settle elapsed: re-enter listening if nothing changed
    fn on_settle(&mut self, generation: u64) {
        if generation != self.ctx.generation
            || !self.ctx.open
            || self.ctx.is_suspended()
            || self.ctx.is_speaking()
        {
            return;
        }
        self.emit_transcription(None);
        self.emit_state(MochiState::Listening, None);
    }

    /// Explicit wake-up; only meaningful while suspended
    fn on_wake_up(&mut self) {
        if self.ctx.is_suspended() {
            self.wake();
        }
    }

    fn wake(&mut self) {
        self.emit_transcription(None);
        self.ctx.set_suspended(false);
        self.emit_state(MochiState::Listening, None);
    }

    /// Release every session resource; idempotent, each step guarded
    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        tracing::debug!(session = %self.ctx.id, "tearing down session");

        self.transport.close().await;

        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(forward) = self.forward.take() {
            forward.abort();
        }

        self.playback.close();
        self.ctx.reset();

        let _ = self.ui.send(UiEvent::History(Vec::new()));
        self.emit_transcription(None);
    }

    fn emit_state(&self, state: MochiState, status: Option<String>) {
        tracing::debug!(session = %self.ctx.id, %state, "state change");
        let _ = self.ui.send(UiEvent::State { state, status });
    }

    fn emit_transcription(&self, fragment: Option<TranscriptionFragment>) {
        let _ = self.ui.send(UiEvent::Transcription(fragment));
    }
}
