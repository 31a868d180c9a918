//! Configuration management for the Mochi core

pub mod file;

use secrecy::SecretString;

/// Mochi core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Voice/session configuration
    pub voice: VoiceConfig,

    /// Remote service configuration
    pub services: ServicesConfig,
}

/// Voice and session behavior configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Phrases that wake Mochi from conversational sleep
    /// (case-insensitive substring match against the input transcription)
    pub wake_phrases: Vec<String>,

    /// Phrases that send Mochi to conversational sleep at turn end
    pub farewell_phrases: Vec<String>,

    /// Microphone capture sample rate (wire upstream rate)
    pub capture_sample_rate: u32,

    /// Playback sample rate (wire downstream rate)
    pub playback_sample_rate: u32,

    /// Capture chunk size in samples
    pub chunk_size: usize,

    /// Delay before re-entering LISTENING after a completed turn
    pub settle_delay_ms: u64,

    /// Voice identifier for alarm announcements
    pub alarm_voice: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            wake_phrases: vec!["mochi ơi".to_string(), "dậy đi mochi".to_string()],
            farewell_phrases: vec![
                "tạm biệt".to_string(),
                "ngủ ngon".to_string(),
                "đi ngủ đi".to_string(),
                "goodbye".to_string(),
            ],
            capture_sample_rate: 16_000,
            playback_sample_rate: 24_000,
            // 100ms at 16kHz
            chunk_size: 1_600,
            settle_delay_ms: 2_500,
            alarm_voice: "Aoede".to_string(),
        }
    }
}

/// Remote AI service configuration
#[derive(Clone)]
pub struct ServicesConfig {
    /// API key for the hosted AI service
    pub api_key: SecretString,

    /// Live (duplex audio) model identifier
    pub live_model: String,

    /// WebSocket endpoint for live sessions
    pub live_url: String,

    /// Text generation model identifier (search, weather, quotes)
    pub text_model: String,

    /// Speech synthesis model identifier (alarm announcements)
    pub speech_model: String,

    /// REST base URL for text/speech generation
    pub rest_url: String,
}

impl std::fmt::Debug for ServicesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicesConfig")
            .field("api_key", &"<redacted>")
            .field("live_model", &self.live_model)
            .field("live_url", &self.live_url)
            .field("text_model", &self.text_model)
            .field("speech_model", &self.speech_model)
            .field("rest_url", &self.rest_url)
            .finish()
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::from(String::new()),
            live_model: "gemini-2.0-flash-live-001".to_string(),
            live_url: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
            text_model: "gemini-2.0-flash".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            rest_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voice: VoiceConfig::default(),
            services: ServicesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, overlaid with the TOML config file,
    /// with the API key falling back to the `MOCHI_API_KEY` env var.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();
        let overlay = file::load_config_file();
        config.apply_overlay(overlay);

        if secrecy::ExposeSecret::expose_secret(&config.services.api_key).is_empty() {
            if let Ok(key) = std::env::var("MOCHI_API_KEY") {
                config.services.api_key = SecretString::from(key);
            }
        }

        config
    }

    /// Apply a partial TOML overlay on top of the current values
    fn apply_overlay(&mut self, overlay: file::MochiConfigFile) {
        let voice = overlay.voice;
        if let Some(v) = voice.wake_phrases {
            self.voice.wake_phrases = v;
        }
        if let Some(v) = voice.farewell_phrases {
            self.voice.farewell_phrases = v;
        }
        if let Some(v) = voice.settle_delay_ms {
            self.voice.settle_delay_ms = v;
        }
        if let Some(v) = voice.alarm_voice {
            self.voice.alarm_voice = v;
        }

        let services = overlay.services;
        if let Some(v) = services.api_key {
            self.services.api_key = SecretString::from(v);
        }
        if let Some(v) = services.live_model {
            self.services.live_model = v;
        }
        if let Some(v) = services.live_url {
            self.services.live_url = v;
        }
        if let Some(v) = services.text_model {
            self.services.text_model = v;
        }
        if let Some(v) = services.speech_model {
            self.services.speech_model = v;
        }
        if let Some(v) = services.rest_url {
            self.services.rest_url = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_wake_and_farewell_phrases() {
        let config = Config::default();
        assert!(!config.voice.wake_phrases.is_empty());
        assert!(config
            .voice
            .farewell_phrases
            .iter()
            .any(|p| p == "tạm biệt"));
    }

    #[test]
    fn overlay_replaces_only_present_fields() {
        let mut config = Config::default();
        let overlay: file::MochiConfigFile = toml::from_str(
            r#"
            [voice]
            settle_delay_ms = 1000

            [services]
            text_model = "gemini-next"
            "#,
        )
        .unwrap();

        config.apply_overlay(overlay);

        assert_eq!(config.voice.settle_delay_ms, 1000);
        assert_eq!(config.services.text_model, "gemini-next");
        // Untouched fields keep defaults
        assert_eq!(config.voice.capture_sample_rate, 16_000);
        assert!(!config.voice.wake_phrases.is_empty());
    }
}
