//! Service configuration.
//!
//! Loaded from a YAML file whose path comes from `TRANSIT_SENSOR_CONFIG`
//! (default `config.yaml`). The RNV client secret can be supplied through
//! `RNV_CLIENT_SECRET` instead of the file.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::coordinator::CoordinatorConfig;
use crate::domain::{InvalidQuery, Language, Locale, StationQuery};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TRANSIT_SENSOR_CONFIG";

/// Environment variable overriding the RNV client secret.
pub const RNV_SECRET_ENV: &str = "RNV_CLIENT_SECRET";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    /// Host language code; `de*` selects German display strings.
    #[serde(default = "Config::default_language")]
    pub language: String,
    /// IANA time zone for clock times and the night window.
    #[serde(default = "Config::default_timezone")]
    pub timezone: String,
    #[serde(default = "Config::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "Config::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long a fetched payload is shared between stations with the same
    /// id and radius.
    #[serde(default = "Config::default_payload_cache_ttl_secs")]
    pub payload_cache_ttl_secs: u64,
    #[serde(default = "Config::default_listen")]
    pub listen: SocketAddr,
    /// Where sensor state is persisted across restarts.
    #[serde(default = "Config::default_state_file")]
    pub state_file: PathBuf,
    /// Optional static station directory (JSON).
    #[serde(default)]
    pub station_directory: Option<PathBuf>,
    #[serde(default)]
    pub stations: Vec<StationConfig>,
}

/// Which backend to poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Motis(MotisBackend),
    Rnv(RnvBackend),
    /// Both backends for the same stations, merged.
    Combined { motis: MotisBackend, rnv: RnvBackend },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MotisBackend {
    /// Base URL; empty means the public instance.
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Deserialize)]
pub struct RnvBackend {
    pub tenant_id: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub resource: String,
    #[serde(default)]
    pub api_url: Option<String>,
    /// Token obtained earlier, reused until it expires.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_on: Option<i64>,
}

impl std::fmt::Debug for RnvBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RnvBackend")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("resource", &self.resource)
            .field("api_url", &self.api_url)
            .field("expires_on", &self.expires_on)
            .finish_non_exhaustive()
    }
}

/// One configured station.
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
    /// Regular expression searched in the destination label.
    #[serde(default)]
    pub destination_filter: Option<String>,
    /// Search radius in meters (Motis only).
    #[serde(default)]
    pub radius: Option<u32>,
}

impl StationConfig {
    pub fn to_query(&self) -> Result<StationQuery, InvalidQuery> {
        let mut query = StationQuery::new(&self.id)?;
        if let Some(name) = &self.name {
            query = query.with_name(name);
        }
        if let Some(platform) = &self.platform {
            query = query.with_platform(platform);
        }
        if let Some(line) = &self.line {
            query = query.with_line(line);
        }
        if let Some(filter) = &self.destination_filter {
            query = query.with_destination_filter(filter)?;
        }
        if let Some(radius) = self.radius {
            query = query.with_radius(radius);
        }
        Ok(query)
    }
}

impl Config {
    fn default_language() -> String {
        "en".to_string()
    }
    fn default_timezone() -> String {
        "Europe/Berlin".to_string()
    }
    fn default_poll_interval_secs() -> u64 {
        60
    }
    fn default_request_timeout_secs() -> u64 {
        10
    }
    fn default_payload_cache_ttl_secs() -> u64 {
        30
    }
    fn default_listen() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 3000))
    }
    fn default_state_file() -> PathBuf {
        PathBuf::from("sensor_state.json")
    }

    /// Path of the config file, from the environment.
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.yaml"))
    }

    /// Read, apply environment overrides, and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let Some(secret) = lookup(RNV_SECRET_ENV) else {
            return;
        };
        match &mut self.backend {
            BackendConfig::Rnv(rnv) | BackendConfig::Combined { rnv, .. } => {
                rnv.client_secret = secret;
            }
            BackendConfig::Motis(_) => {}
        }
    }

    /// Check everything that can be checked without the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.backend {
            BackendConfig::Motis(motis) => motis.validate()?,
            BackendConfig::Rnv(rnv) => rnv.validate()?,
            BackendConfig::Combined { motis, rnv } => {
                motis.validate()?;
                rnv.validate()?;
            }
        }

        self.locale()?;

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval("poll_interval_secs"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidInterval("request_timeout_secs"));
        }

        let queries = self.station_queries()?;
        let mut seen = HashSet::new();
        for query in &queries {
            let key = (
                query.station_id(),
                query.platform(),
                query.line(),
                query.destination_filter().map(|r| r.as_str()),
                query.radius(),
            );
            if !seen.insert(key) {
                return Err(ConfigError::DuplicateStation {
                    id: query.station_id().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Build the station queries in configuration order.
    pub fn station_queries(&self) -> Result<Vec<StationQuery>, ConfigError> {
        self.stations
            .iter()
            .enumerate()
            .map(|(index, station)| {
                station
                    .to_query()
                    .map_err(|source| ConfigError::InvalidStation { index, source })
            })
            .collect()
    }

    pub fn locale(&self) -> Result<Locale, ConfigError> {
        let timezone = self
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))?;
        Ok(Locale::new(Language::from_code(&self.language), timezone))
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    pub fn payload_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.payload_cache_ttl_secs)
    }
}

impl MotisBackend {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.url.is_empty() {
            sanitize_credential("url", &self.url)?;
        }
        Ok(())
    }
}

impl RnvBackend {
    fn validate(&self) -> Result<(), ConfigError> {
        sanitize_credential("tenant_id", &self.tenant_id)?;
        sanitize_credential("client_id", &self.client_id)?;
        sanitize_credential("client_secret", &self.client_secret)?;
        sanitize_credential("resource", &self.resource)?;
        if let Some(url) = &self.api_url {
            sanitize_credential("url", url)?;
        }
        Ok(())
    }
}

/// Prefixes that show a value was pasted together with its key.
fn forbidden_prefixes(field: &str) -> &'static [&'static str] {
    match field {
        "url" => &["url="],
        _ => &[],
    }
}

/// Reject credential values with surrounding whitespace, empty values, and
/// values that still carry a `key=` prefix.
pub fn sanitize_credential(field: &'static str, value: &str) -> Result<String, ConfigError> {
    let cleaned = value.trim();
    if cleaned.is_empty() || cleaned != value {
        return Err(ConfigError::InvalidCredential { field });
    }

    let lower = cleaned.to_lowercase();
    if forbidden_prefixes(field).iter().any(|p| lower.starts_with(p)) {
        return Err(ConfigError::InvalidCredential { field });
    }

    Ok(cleaned.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid format for {field}")]
    InvalidCredential { field: &'static str },
    #[error("Invalid station #{index}: {source}")]
    InvalidStation { index: usize, source: InvalidQuery },
    #[error("Station {id} is configured twice with the same filters")]
    DuplicateStation { id: String },
    #[error("Unknown time zone: {0}")]
    InvalidTimezone(String),
    #[error("{0} must be greater than zero")]
    InvalidInterval(&'static str),
}
