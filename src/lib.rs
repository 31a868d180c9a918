//! Mochi - voice-first virtual companion core
//!
//! This library mediates a real-time, bidirectional audio conversation
//! between a user and a hosted conversational-AI service, plus the local
//! state around it: alarms, ambient lookups, and power-saving behavior.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                    UI layer                       │
//! │   start/stop/wake  │  state/history/transcript   │
//! └─────────────────────┬────────────────────────────┘
//!                       │
//! ┌─────────────────────▼────────────────────────────┐
//! │                 Mochi core                        │
//! │  Session  │  Audio pipeline  │  Alarms  │ Tools  │
//! └─────────────────────┬────────────────────────────┘
//!                       │
//! ┌─────────────────────▼────────────────────────────┐
//! │            Hosted AI services                     │
//! │   Live duplex  │  Text/Search  │  Speech         │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The UI starts a session with a [`UserProfile`]; the core opens the
//! microphone and the duplex connection, streams audio both ways, runs tool
//! calls, and publishes every observable change on the [`Companion`]'s
//! event channel.

pub mod alarm;
pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod profile;
pub mod prompt;
pub mod services;
pub mod session;
pub mod tools;

pub use alarm::{AlarmId, AlarmInfo, AlarmRing, AlarmScheduler};
pub use config::{Config, ServicesConfig, VoiceConfig};
pub use error::{Error, Result};
pub use profile::{Gender, GeoPoint, UserProfile};
pub use services::{Quote, QuoteService, SpeechService, TextService, Weather, WeatherService};
pub use session::Companion;
pub use session::events::{
    HistoryEntry, ServerEvent, Speaker, ToolCallRequest, TranscriptionFragment, UiEvent,
};
pub use session::state::MochiState;
pub use session::transport::{LiveConnector, LiveTransport, SessionSetup};
pub use tools::{ToolDispatcher, ToolReply};
