//! Audio pipeline
//!
//! Wire codec, microphone capture, and gapless playback scheduling.
//! Capture runs at 16kHz mono (upstream), playback at 24kHz (downstream).

pub mod capture;
pub mod codec;
pub mod playback;

pub use capture::{CaptureStream, Chunker};
pub use playback::{AudioSegment, PlaybackQueue, QueueState, play_once_blocking};
