//! Companion surface integration tests
//!
//! Exercises the public orchestrator API without live services or audio
//! hardware: lifecycle idempotency, failure surfacing, and the process-wide
//! alarm scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use secrecy::SecretString;
use tokio::sync::{broadcast, mpsc};

use mochi_core::session::transport::{LiveConnector, LiveTransport, SessionSetup};
use mochi_core::{
    Companion, Config, Error, MochiState, Result, ServerEvent, UiEvent, UserProfile,
};

/// A connector whose sessions always fail to open
struct FailingConnector;

#[async_trait]
impl LiveConnector for FailingConnector {
    async fn connect(
        &self,
        _setup: SessionSetup,
    ) -> Result<(Arc<dyn LiveTransport>, mpsc::Receiver<ServerEvent>)> {
        Err(Error::Transport("connection refused".to_string()))
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.services.api_key = SecretString::from("test-key".to_string());
    config
}

fn companion() -> Companion {
    Companion::with_connector(test_config(), Arc::new(FailingConnector)).unwrap()
}

fn drain_states(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<MochiState> {
    let mut states = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let UiEvent::State { state, .. } = event {
            states.push(state);
        }
    }
    states
}

#[tokio::test]
async fn companion_requires_an_api_key() {
    assert!(matches!(
        Companion::with_connector(Config::default(), Arc::new(FailingConnector)),
        Err(Error::Config(_))
    ));
}

#[tokio::test]
async fn stop_without_a_session_is_a_quiet_no_op() {
    let companion = companion();

    companion.stop_session().await;
    companion.stop_session().await;
    companion.wake_up().await;
}

#[tokio::test]
async fn failed_start_surfaces_error_then_settles_idle() {
    let companion = companion();
    let mut rx = companion.subscribe();

    let result = companion.start_session(&UserProfile::default()).await;
    assert!(result.is_err());

    let states = drain_states(&mut rx);
    assert_eq!(states.first(), Some(&MochiState::Loading));
    assert!(states.contains(&MochiState::Error));
    assert_eq!(states.last(), Some(&MochiState::Idle));

    // The failed attempt left no session behind
    companion.stop_session().await;
}

#[tokio::test]
async fn alarms_outlive_session_attempts() {
    let companion = companion();

    let id = companion
        .alarms()
        .set_alarm(Utc::now() + ChronoDuration::hours(2), "Tưới cây")
        .unwrap();

    // A failed session start does not disturb the scheduler
    let _ = companion.start_session(&UserProfile::default()).await;
    companion.stop_session().await;

    let active = companion.alarms().active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].label, "Tưới cây");

    companion.alarms().cancel(id);
    companion.alarms().cancel(id);
    assert!(companion.alarms().active().is_empty());
}

#[tokio::test]
async fn past_alarms_are_rejected_through_the_public_surface() {
    let companion = companion();

    let id = companion
        .alarms()
        .set_alarm(Utc::now() - ChronoDuration::minutes(1), "muộn rồi");

    assert!(id.is_none());
    assert!(companion.alarms().active().is_empty());
}
