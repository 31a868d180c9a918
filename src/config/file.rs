//! TOML configuration file loading
//!
//! Supports `~/.config/mochi/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct MochiConfigFile {
    /// Voice/session configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Remote service configuration
    #[serde(default)]
    pub services: ServicesFileConfig,
}

/// Voice/session configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Wake phrases (e.g. "mochi ơi")
    pub wake_phrases: Option<Vec<String>>,

    /// Farewell phrases (e.g. "tạm biệt")
    pub farewell_phrases: Option<Vec<String>>,

    /// Post-turn settle delay in milliseconds
    pub settle_delay_ms: Option<u64>,

    /// Voice for alarm announcements
    pub alarm_voice: Option<String>,
}

/// Remote service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServicesFileConfig {
    pub api_key: Option<String>,
    pub live_model: Option<String>,
    pub live_url: Option<String>,
    pub text_model: Option<String>,
    pub speech_model: Option<String>,
    pub rest_url: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `MochiConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> MochiConfigFile {
    let Some(path) = config_file_path() else {
        return MochiConfigFile::default();
    };

    if !path.exists() {
        return MochiConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                MochiConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            MochiConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/mochi/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("mochi").join("config.toml"))
}
