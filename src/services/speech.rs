//! Remote speech synthesis service
//!
//! Used for standalone alarm announcements outside any live session. The
//! endpoint returns raw 24kHz mono PCM16, base64-wrapped in the response.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::audio::codec;
use crate::config::ServicesConfig;
use crate::{Error, Result};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest {
    contents: Vec<Content>,
    generation_config: SpeechGenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechGenerationConfig {
    response_modalities: Vec<String>,
    speech_config: SpeechConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidatePart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: String,
}

/// Client for the hosted speech synthesis endpoint
pub struct SpeechService {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl SpeechService {
    /// Create a speech service from the services configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "API key required for speech service".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.speech_model.clone(),
            base_url: config.rest_url.clone(),
        })
    }

    /// Synthesize speech, returning raw PCM16 audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or the response carries no audio
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let body = SynthesizeRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }],
            generation_config: SpeechGenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                },
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "speech synthesis error");
            return Err(Error::Speech(format!("synthesis error {status}: {body}")));
        }

        let result: SynthesizeResponse = response.json().await?;

        let audio = result
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.iter().find_map(|p| p.inline_data.as_ref()))
            .map(|d| codec::decode_base64(&d.data))
            .unwrap_or_default();

        if audio.is_empty() {
            return Err(Error::Speech("no audio in synthesis response".to_string()));
        }

        tracing::debug!(bytes = audio.len(), "speech synthesis complete");
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_extracts_inline_audio() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{"inlineData": {"data": "AAD/fw=="}}] }
            }]
        }"#;
        let parsed: SynthesizeResponse = serde_json::from_str(raw).unwrap();
        let audio = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .map(|d| codec::decode_base64(&d.data))
            .unwrap();
        assert_eq!(audio, vec![0x00, 0x00, 0xff, 0x7f]);
    }
}
