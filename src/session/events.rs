//! Session event types
//!
//! Inbound server events are a tagged union dispatched through the state
//! machine — one variant, one transition. Outbound [`UiEvent`]s are the only
//! way the core talks to the surrounding UI layer.

use crate::session::state::MochiState;

/// Who said something
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// A live, still-accumulating transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionFragment {
    pub speaker: Speaker,
    pub text: String,
}

/// A finalized conversation entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// One function call requested by the remote model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    /// Correlation id echoed back in the tool response
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments object
    pub args: serde_json::Value,
}

/// Inbound events from the live transport
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Raw PCM16 audio bytes for playback
    AudioDelta(Vec<u8>),
    /// Incremental user-speech transcription
    InputTranscription(String),
    /// Incremental assistant-speech transcription
    OutputTranscription(String),
    /// Batch of function calls; each must receive exactly one response
    ToolCall(Vec<ToolCallRequest>),
    /// User barged in while the assistant was speaking
    Interrupted,
    /// The current turn is complete
    TurnComplete,
    /// Fatal transport or server error
    Error(String),
    /// The connection closed (server- or self-initiated)
    Closed(String),
}

/// Events published to the UI layer
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Visible Mochi state changed
    State {
        state: MochiState,
        status: Option<String>,
    },
    /// Conversation history changed
    History(Vec<HistoryEntry>),
    /// Displayed transcription changed (`None` clears the display)
    Transcription(Option<TranscriptionFragment>),
}
