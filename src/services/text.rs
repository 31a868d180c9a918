//! Remote text generation service
//!
//! Single entry point for every non-live model call: free-text search
//! synthesis, structured weather lookups, and quote retrieval. Wraps the
//! `generateContent` REST endpoint.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::ServicesConfig;
use crate::{Error, Result};

/// One text generation request
#[derive(Debug, Clone, Default)]
pub struct TextRequest {
    /// User prompt
    pub prompt: String,
    /// Optional system instruction
    pub system: Option<String>,
    /// JSON schema forcing structured output
    pub response_schema: Option<serde_json::Value>,
    /// Ground the answer with web search
    pub web_search: bool,
}

impl TextRequest {
    #[must_use]
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
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
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
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
struct CandidatePart {
    text: Option<String>,
}

/// Client for the hosted text generation endpoint
pub struct TextService {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl TextService {
    /// Create a text service from the services configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config("API key required for text service".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.text_model.clone(),
            base_url: config.rest_url.clone(),
        })
    }

    /// Generate text for a request
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] on HTTP 429, [`Error::Text`] on any
    /// other service failure.
    pub async fn generate(&self, request: TextRequest) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt,
                }],
            }],
            system_instruction: request.system.map(|text| Content {
                parts: vec![Part { text }],
            }),
            tools: if request.web_search {
                vec![Tool {
                    google_search: serde_json::json!({}),
                }]
            } else {
                Vec::new()
            },
            generation_config: request.response_schema.map(|schema| GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            }),
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "text generation request failed");
                e
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("text service rate limited");
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "text service error");
            return Err(Error::Text(format!("service error {status}: {body}")));
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse text response");
            e
        })?;

        let text: String = result
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Text("empty response from text service".to_string()));
        }

        tracing::debug!(chars = text.len(), "text generation complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_web_search_tool() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "thời tiết Hà Nội".to_string(),
                }],
            }],
            system_instruction: None,
            tools: vec![Tool {
                google_search: serde_json::json!({}),
            }],
            generation_config: None,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json["tools"][0]["googleSearch"].is_object());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn response_text_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{"text": "Xin "}, {"text": "chào"}] }
            }]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        assert_eq!(text, "Xin chào");
    }
}
