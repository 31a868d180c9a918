//! Weather lookup
//!
//! Asks the text service for current conditions at a coordinate in a strict
//! `"TEMPERATURE;CONDITION;EMOJI"` contract and caches successes for a short
//! TTL. Lookup failures are typed so the display layer can show inline
//! fallback text without disturbing anything else.

use std::sync::Arc;
use std::time::Duration;

use mini_moka::sync::Cache;

use crate::profile::GeoPoint;
use crate::services::text::{TextRequest, TextService};
use crate::{Error, Result};

/// Successful weather cache lifetime
const WEATHER_TTL: Duration = Duration::from_secs(10 * 60);

/// Sentinel first field marking an unresolvable location
const NOT_FOUND_SENTINEL: &str = "NULL";

/// Parsed current weather
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weather {
    /// Temperature in degrees Celsius
    pub temperature: i32,
    /// Short textual condition (e.g. "Nắng")
    pub condition: String,
    /// Single condition emoji
    pub emoji: String,
}

/// Weather lookup with a process-wide TTL cache
pub struct WeatherService {
    text: Arc<TextService>,
    cache: Cache<String, Weather>,
}

impl WeatherService {
    #[must_use]
    pub fn new(text: Arc<TextService>) -> Self {
        Self {
            text,
            cache: Cache::builder().time_to_live(WEATHER_TTL).build(),
        }
    }

    /// Current weather at a coordinate.
    ///
    /// Concurrent identical lookups are not deduplicated; both callers hit
    /// the remote service and the last success wins the cache slot.
    ///
    /// # Errors
    ///
    /// [`Error::LocationNotFound`] when the service reports the sentinel,
    /// [`Error::WeatherFormat`] when the response breaks the contract.
    pub async fn current(&self, point: GeoPoint) -> Result<Weather> {
        let key = cache_key(point);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(%key, "weather cache hit");
            return Ok(cached);
        }

        let prompt = format!(
            "Thời tiết hiện tại tại tọa độ ({lat:.4}, {lng:.4})? \
             Trả lời đúng một dòng theo định dạng NHIỆT_ĐỘ;TÌNH_TRẠNG;EMOJI, \
             ví dụ: 28;Nắng;☀️. Nếu không xác định được vị trí, trả lời \
             NULL;Không thể xác định;❓.",
            lat = point.latitude,
            lng = point.longitude,
        );

        let raw = self
            .text
            .generate(TextRequest::prompt(prompt).with_web_search())
            .await?;

        self.ingest(key, &raw)
    }

    /// Parse a raw response and cache it on success
    pub(crate) fn ingest(&self, key: String, raw: &str) -> Result<Weather> {
        let weather = parse_weather(raw)?;
        self.cache.insert(key, weather.clone());
        Ok(weather)
    }

    #[cfg(test)]
    fn cached(&self, key: &str) -> Option<Weather> {
        self.cache.get(&key.to_string())
    }
}

fn cache_key(point: GeoPoint) -> String {
    format!("{:.2},{:.2}", point.latitude, point.longitude)
}

/// Parse the `"TEMPERATURE;CONDITION;EMOJI"` contract
pub(crate) fn parse_weather(raw: &str) -> Result<Weather> {
    let fields: Vec<&str> = raw.trim().split(';').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(Error::WeatherFormat(format!(
            "expected 3 fields, got {}",
            fields.len()
        )));
    }

    if fields[0].eq_ignore_ascii_case(NOT_FOUND_SENTINEL) {
        return Err(Error::LocationNotFound(
            "Không tìm thấy thời tiết cho vị trí này".to_string(),
        ));
    }

    let temperature: i32 = fields[0]
        .parse()
        .map_err(|_| Error::WeatherFormat(format!("bad temperature: {}", fields[0])))?;

    Ok(Weather {
        temperature,
        condition: fields[1].to_string(),
        emoji: fields[2].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServicesConfig;
    use secrecy::SecretString;

    fn service() -> WeatherService {
        let config = ServicesConfig {
            api_key: SecretString::from("test-key".to_string()),
            ..ServicesConfig::default()
        };
        WeatherService::new(Arc::new(TextService::new(&config).unwrap()))
    }

    #[test]
    fn parses_well_formed_response() {
        let weather = parse_weather("28;Nắng;☀️").unwrap();
        assert_eq!(
            weather,
            Weather {
                temperature: 28,
                condition: "Nắng".to_string(),
                emoji: "☀️".to_string(),
            }
        );
    }

    #[test]
    fn null_sentinel_is_location_not_found() {
        let err = parse_weather("NULL;Không thể xác định;❓").unwrap_err();
        assert!(matches!(err, Error::LocationNotFound(_)));
    }

    #[test]
    fn wrong_field_count_is_format_error() {
        assert!(matches!(
            parse_weather("28;Nắng"),
            Err(Error::WeatherFormat(_))
        ));
        assert!(matches!(
            parse_weather("hôm nay trời đẹp"),
            Err(Error::WeatherFormat(_))
        ));
    }

    #[test]
    fn non_numeric_temperature_is_format_error() {
        assert!(matches!(
            parse_weather("ấm;Nắng;☀️"),
            Err(Error::WeatherFormat(_))
        ));
    }

    #[test]
    fn failures_never_touch_the_cache() {
        let weather = service();
        let key = "21.03,105.85".to_string();

        assert!(weather.ingest(key.clone(), "NULL;Không thể xác định;❓").is_err());
        assert!(weather.cached(&key).is_none());

        weather.ingest(key.clone(), "28;Nắng;☀️").unwrap();
        assert_eq!(weather.cached(&key).unwrap().temperature, 28);
    }
}
