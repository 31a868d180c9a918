//! Visible companion state and per-session context

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use crate::session::events::HistoryEntry;

/// The externally visible Mochi state
///
/// Transitions are driven only by the session orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MochiState {
    /// No session, or between turns
    Idle,
    /// Waiting for user speech
    Listening,
    /// Running a tool (e.g. a web search)
    Thinking,
    /// Assistant audio is playing
    Speaking,
    /// Acquiring microphone and opening the connection
    Loading,
    /// A fatal session error occurred
    Error,
    /// Conversational sleep: only the wake phrase is monitored
    Sleeping,
    /// Deep-sleep request acknowledged; display layer enters ambient mode
    EnteringDeepSleep,
}

impl std::fmt::Display for MochiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Sleeping => "sleeping",
            Self::EnteringDeepSleep => "entering_deep_sleep",
        };
        f.write_str(name)
    }
}

/// All mutable state owned by one live session.
///
/// Created on session start, fully reset on teardown — nothing carries over
/// between sessions.
pub(crate) struct SessionContext {
    /// Session identifier for logs
    pub id: Uuid,
    /// Epoch guard for scheduled continuations
    pub generation: u64,
    /// False once the connection is known closed
    pub open: bool,
    /// Assistant audio currently playing; gates the capture pipeline
    pub speaking: Arc<AtomicBool>,
    /// Wake-word-only mode; gates what reaches the display
    pub suspended: Arc<AtomicBool>,
    /// Set by the deep-sleep tool, consumed at the next turn boundary
    pub deep_sleep_requested: bool,
    /// Accumulating user transcription for the current turn
    pub input_acc: String,
    /// Accumulating assistant transcription for the current turn
    pub output_acc: String,
    /// Finalized conversation entries for this session
    pub history: Vec<HistoryEntry>,
}

impl SessionContext {
    pub fn new(generation: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            open: true,
            speaking: Arc::new(AtomicBool::new(false)),
            suspended: Arc::new(AtomicBool::new(false)),
            deep_sleep_requested: false,
            input_acc: String::new(),
            output_acc: String::new(),
            history: Vec::new(),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }

    pub fn set_speaking(&self, value: bool) {
        self.speaking.store(value, Ordering::Relaxed);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    pub fn set_suspended(&self, value: bool) {
        self.suspended.store(value, Ordering::Relaxed);
    }

    /// Reset every per-session flag and accumulator
    pub fn reset(&mut self) {
        self.open = false;
        self.set_speaking(false);
        self.set_suspended(false);
        self.deep_sleep_requested = false;
        self.input_acc.clear();
        self.output_acc.clear();
        self.history.clear();
    }
}
