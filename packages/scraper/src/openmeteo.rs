//! Client for the Open-Meteo hourly forecast API.
//!
//! Each request covers one location from the current hour through the
//! next 24 hours. Rate limiting (`429`) and transport failures back off
//! exponentially (`retry_delay * 2^n`); any other non-success status fails
//! immediately.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use grid_ingest_source_models::WeatherLocation;

use crate::{DownloadError, HttpClient};

/// Hourly variables requested from the API.
pub const HOURLY_VARIABLES: &str =
    "temperature_2m,relativehumidity_2m,direct_normal_irradiance,wind_speed_10m";

/// Open-Meteo client settings.
#[derive(Debug, Clone)]
pub struct OpenMeteoConfig {
    /// Forecast endpoint.
    pub base_url: String,
    /// API key passed as `apikey`.
    pub api_key: String,
    /// Time zone the hourly series is expressed in.
    pub timezone: String,
    /// Total attempts per location.
    pub max_retries: u32,
    /// Base backoff between attempts.
    pub retry_delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenMeteoConfig {
    /// Default settings with the given API key.
    #[must_use]
    pub fn with_api_key(api_key: &str) -> Self {
        Self {
            base_url: "https://customer-api.open-meteo.com/v1/forecast".to_string(),
            api_key: api_key.to_string(),
            timezone: "America/New_York".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Open-Meteo client over an [`HttpClient`].
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Arc<dyn HttpClient>,
    config: OpenMeteoConfig,
}

impl std::fmt::Debug for OpenMeteoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenMeteoClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenMeteoClient {
    /// Creates a client.
    #[must_use]
    pub fn new(client: Arc<dyn HttpClient>, config: OpenMeteoConfig) -> Self {
        Self { client, config }
    }

    /// Request URL for one location and date range.
    #[must_use]
    pub fn request_url(&self, location: &WeatherLocation, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{base}?latitude={lat}&longitude={lon}&hourly={HOURLY_VARIABLES}&apikey={key}\
             &timezone={tz}&start_date={start}&end_date={end}&models=best_match",
            base = self.config.base_url,
            lat = location.latitude,
            lon = location.longitude,
            key = self.config.api_key,
            tz = self.config.timezone,
            start = start.format("%Y-%m-%d"),
            end = end.format("%Y-%m-%d"),
        )
    }

    /// Fetches the next 24 hours for `location`, starting at `now`'s hour.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_range`].
    pub async fn fetch_next_day(
        &self,
        location: &WeatherLocation,
        now: NaiveDateTime,
    ) -> Result<serde_json::Value, DownloadError> {
        let end = now + TimeDelta::hours(24);
        self.fetch_range(location, now.date(), end.date()).await
    }

    /// Fetches the hourly series for `location` between two dates.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Api`] on a non-retryable status, an
    /// unparseable body, or a body without `hourly` data, and the last
    /// transport or rate-limit error once retries run out.
    pub async fn fetch_range(
        &self,
        location: &WeatherLocation,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<serde_json::Value, DownloadError> {
        let url = self.request_url(location, start, end);
        let max_retries = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..max_retries {
            let error = match self.client.get(&url, self.config.timeout).await {
                Ok(response) if response.is_success() => return parse_body(location, &response.body),
                Ok(response) if response.status == 429 => DownloadError::Status {
                    url: self.config.base_url.clone(),
                    status: 429,
                },
                Ok(response) => {
                    return Err(DownloadError::Api {
                        message: format!(
                            "API error for {}: HTTP {} - {}",
                            location.name,
                            response.status,
                            String::from_utf8_lossy(&response.body)
                        ),
                    });
                }
                Err(e) => DownloadError::Http {
                    url: self.config.base_url.clone(),
                    message: e.to_string(),
                },
            };

            if attempt + 1 < max_retries {
                let delay = self.config.retry_delay * 2u32.pow(attempt);
                log::warn!(
                    "{}: {error}, retrying in {delay:?} ({}/{max_retries})",
                    location.name,
                    attempt + 1
                );
                tokio::time::sleep(delay).await;
            }
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| DownloadError::Api {
            message: format!("no attempts made for {}", location.name),
        }))
    }
}

fn parse_body(location: &WeatherLocation, body: &[u8]) -> Result<serde_json::Value, DownloadError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| DownloadError::Api {
        message: format!("invalid JSON for {}: {e}", location.name),
    })?;

    if value.get("hourly").is_none() {
        return Err(DownloadError::Api {
            message: format!("No hourly data in response for {}", location.name),
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scripted::{Reply, ScriptedClient};

    const ALBANY: WeatherLocation = WeatherLocation {
        zone: "CAPITL",
        name: "Albany",
        latitude: 42.6526,
        longitude: -73.7562,
    };

    fn config() -> OpenMeteoConfig {
        OpenMeteoConfig {
            base_url: "http://meteo.test/v1/forecast".to_string(),
            retry_delay: Duration::ZERO,
            ..OpenMeteoConfig::with_api_key("k")
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap()
    }

    #[test]
    fn builds_request_url() {
        let client = OpenMeteoClient::new(Arc::new(ScriptedClient::new()), config());
        let start = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        assert_eq!(
            client.request_url(&ALBANY, start, end),
            "http://meteo.test/v1/forecast?latitude=42.6526&longitude=-73.7562\
             &hourly=temperature_2m,relativehumidity_2m,direct_normal_irradiance,wind_speed_10m\
             &apikey=k&timezone=America/New_York&start_date=2025-12-31&end_date=2026-01-01\
             &models=best_match"
        );
    }

    #[tokio::test]
    async fn retries_rate_limit() {
        let meteo = OpenMeteoClient::new(Arc::new(ScriptedClient::new()), config());
        let url = meteo.request_url(
            &ALBANY,
            now().date(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let client = Arc::new(
            ScriptedClient::new()
                .with(&url, Reply::status(429))
                .with(&url, Reply::json(&json!({"hourly": {"time": []}}))),
        );
        let meteo = OpenMeteoClient::new(client.clone(), config());

        let value = meteo.fetch_next_day(&ALBANY, now()).await.unwrap();
        assert!(value.get("hourly").is_some());
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn other_status_fails_immediately() {
        let meteo = OpenMeteoClient::new(Arc::new(ScriptedClient::new()), config());
        let url = meteo.request_url(&ALBANY, now().date(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let client = Arc::new(ScriptedClient::new().with(&url, Reply::status(401)));
        let meteo = OpenMeteoClient::new(client.clone(), config());

        let err = meteo.fetch_next_day(&ALBANY, now()).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 401"));
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn missing_hourly_is_an_error() {
        let meteo = OpenMeteoClient::new(Arc::new(ScriptedClient::new()), config());
        let url = meteo.request_url(&ALBANY, now().date(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let client = Arc::new(ScriptedClient::new().with(&url, Reply::json(&json!({"error": false}))));
        let meteo = OpenMeteoClient::new(client, config());

        let err = meteo.fetch_next_day(&ALBANY, now()).await.unwrap_err();
        assert!(err.to_string().contains("No hourly data"));
    }
}
