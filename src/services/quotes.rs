//! Inspirational quote retrieval
//!
//! Structured-output request for a small list of quotes, cached with a long
//! TTL. An empty or non-list payload is a typed failure; the display layer
//! falls back to static text.

use std::sync::Arc;
use std::time::Duration;

use mini_moka::sync::Cache;
use serde::Deserialize;

use crate::services::text::{TextRequest, TextService};
use crate::{Error, Result};

/// Quote cache lifetime
const QUOTES_TTL: Duration = Duration::from_secs(60 * 60);

const CACHE_KEY: &str = "quotes";

/// One inspirational quote
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// Quote retrieval with a process-wide TTL cache
pub struct QuoteService {
    text: Arc<TextService>,
    cache: Cache<String, Vec<Quote>>,
}

impl QuoteService {
    #[must_use]
    pub fn new(text: Arc<TextService>) -> Self {
        Self {
            text,
            cache: Cache::builder().time_to_live(QUOTES_TTL).build(),
        }
    }

    /// Fetch a batch of quotes.
    ///
    /// Concurrent callers are not deduplicated (same policy as weather).
    ///
    /// # Errors
    ///
    /// [`Error::QuoteFormat`] when the payload is not a non-empty list.
    pub async fn fetch(&self) -> Result<Vec<Quote>> {
        if let Some(cached) = self.cache.get(&CACHE_KEY.to_string()) {
            tracing::debug!("quote cache hit");
            return Ok(cached);
        }

        let schema = serde_json::json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "author": { "type": "string" }
                },
                "required": ["text", "author"]
            }
        });

        let prompt = "Cho tôi 5 câu nói truyền cảm hứng ngắn bằng tiếng Việt, \
                      kèm tên tác giả."
            .to_string();

        let raw = self
            .text
            .generate(TextRequest::prompt(prompt).with_schema(schema))
            .await?;

        self.ingest(&raw)
    }

    /// Parse a raw payload and cache it on success
    pub(crate) fn ingest(&self, raw: &str) -> Result<Vec<Quote>> {
        let quotes: Vec<Quote> = serde_json::from_str(raw)
            .map_err(|e| Error::QuoteFormat(format!("not a quote list: {e}")))?;

        if quotes.is_empty() {
            return Err(Error::QuoteFormat("empty quote list".to_string()));
        }

        self.cache.insert(CACHE_KEY.to_string(), quotes.clone());
        Ok(quotes)
    }
}
