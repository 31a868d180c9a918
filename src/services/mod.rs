//! Remote AI service clients
//!
//! Text generation (search, weather, quotes) and speech synthesis. The live
//! duplex transport lives in `session::transport`.

pub mod quotes;
pub mod speech;
pub mod text;
pub mod weather;

pub use quotes::{Quote, QuoteService};
pub use speech::SpeechService;
pub use text::{TextRequest, TextService};
pub use weather::{Weather, WeatherService};
