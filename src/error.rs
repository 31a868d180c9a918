//! Error types for the Mochi companion core

use thiserror::Error;

/// Result type alias for Mochi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Mochi core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Live session error
    #[error("session error: {0}")]
    Session(String),

    /// A session is already open
    #[error("a live session is already active")]
    SessionActive,

    /// Live transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Speech synthesis error
    #[error("speech error: {0}")]
    Speech(String),

    /// Text generation error
    #[error("text service error: {0}")]
    Text(String),

    /// Remote service rate limit hit
    #[error("rate limited, try again later")]
    RateLimited,

    /// Weather lookup could not resolve the location
    #[error("location not found: {0}")]
    LocationNotFound(String),

    /// Weather response did not match the expected format
    #[error("malformed weather response: {0}")]
    WeatherFormat(String),

    /// Quote payload was empty or not a list
    #[error("malformed quote response: {0}")]
    QuoteFormat(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// WebSocket error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl Error {
    /// Short human-readable status string for the UI layer.
    ///
    /// Fatal session errors surface through the ERROR state with this text.
    #[must_use]
    pub fn status_text(&self) -> String {
        match self {
            Self::RateLimited => "Mochi hơi quá tải, thử lại sau nhé!".to_string(),
            Self::Audio(_) => "Không mở được micro".to_string(),
            Self::Transport(_) | Self::WebSocket(_) => "Mất kết nối với Mochi".to_string(),
            other => other.to_string(),
        }
    }
}
