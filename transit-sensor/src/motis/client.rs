//! Motis HTTP client.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::source::http::json_or_absent;
use crate::source::{DepartureSource, FetchRequest, RawPayload, SourceError, WindowPolicy};

use super::types::StopMatch;

/// Public Transitous instance.
pub const DEFAULT_BASE_URL: &str = "https://api.transitous.org/api";

/// Number of stop times requested per fetch.
const STOP_TIMES_PER_REQUEST: u32 = 10;

/// Clean up a user-supplied base URL.
///
/// Empty input falls back to the public instance, trailing slashes are
/// stripped and a missing scheme becomes `https://`.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }

    let url = url.trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Configuration for the Motis client.
#[derive(Debug, Clone)]
pub struct MotisConfig {
    /// Base URL, already normalized.
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MotisConfig {
    /// Create a config for the given base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            timeout_secs: 10,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for MotisConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Motis REST API client.
#[derive(Debug, Clone)]
pub struct MotisClient {
    http: reqwest::Client,
    base_url: String,
}

impl MotisClient {
    /// Create a new Motis client with the given configuration.
    pub fn new(config: MotisConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("transit-sensor/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Free-text stop search.
    pub async fn geocode(&self, text: &str) -> Result<Option<Value>, SourceError> {
        let sent = self
            .http
            .get(self.url("v1/geocode"))
            .query(&[("text", text), ("type", "STOP")])
            .send()
            .await;
        json_or_absent(sent, "geocode").await
    }

    /// Places near a coordinate.
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<Value>, SourceError> {
        let place = format!("{lat},{lon}");
        let sent = self
            .http
            .get(self.url("v1/reverse-geocode"))
            .query(&[("place", place.as_str())])
            .send()
            .await;
        json_or_absent(sent, "reverse-geocode").await
    }

    /// Stop times departing from `stop_id` after `time`.
    pub async fn departures(
        &self,
        stop_id: &str,
        time: &str,
        radius: Option<u32>,
    ) -> Result<Option<Value>, SourceError> {
        let mut params = vec![
            ("stopId", stop_id.to_string()),
            ("time", time.to_string()),
            ("n", STOP_TIMES_PER_REQUEST.to_string()),
        ];
        if let Some(radius) = radius {
            params.push(("radius", radius.to_string()));
        }

        let sent = self
            .http
            .get(self.url("v5/stoptimes"))
            .query(&params)
            .send()
            .await;
        json_or_absent(sent, "stoptimes").await
    }

    /// Check that the configured instance answers at all.
    pub async fn probe(&self) -> bool {
        match self.reverse_geocode(0.0, 0.0).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                debug!(error = %e, base_url = %self.base_url, "probe failed");
                false
            }
        }
    }

    /// Stop search with typed results.
    pub async fn search_stops(&self, text: &str) -> Result<Vec<StopMatch>, SourceError> {
        Ok(self
            .geocode(text)
            .await?
            .map(|value| StopMatch::from_response(&value))
            .unwrap_or_default())
    }
}

impl DepartureSource for MotisClient {
    fn window_policy(&self) -> WindowPolicy {
        WindowPolicy::Fixed
    }

    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Option<RawPayload>, SourceError> {
        let payload = self
            .departures(
                request.query.station_id(),
                &request.window.start_param(),
                request.query.radius(),
            )
            .await?;
        Ok(payload.map(RawPayload::StopTimes))
    }
}
