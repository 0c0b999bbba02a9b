//! Station lookup by id.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::OnceCell;
use tracing::info;

use super::error::StationError;

/// Process-wide directory, loaded on first use.
static DIRECTORY: OnceCell<Arc<StationDirectory>> = OnceCell::const_new();

#[derive(Debug, Deserialize)]
struct StationFile {
    #[serde(default)]
    stations: Vec<StationRecord>,
}

/// One station as it appears in the directory file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "globalID", default)]
    pub global_id: Option<String>,
    #[serde(default)]
    pub poles: Vec<Pole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pole {
    #[serde(default)]
    pub location: Option<PoleLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoleLocation {
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

/// A station's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Station lookup table.
#[derive(Debug, Default)]
pub struct StationDirectory {
    stations: Vec<StationRecord>,
    by_id: HashMap<String, usize>,
}

impl StationDirectory {
    /// Parse a directory file's contents.
    pub fn from_json(json: &str) -> Result<Self, StationError> {
        let file: StationFile = serde_json::from_str(json).map_err(|e| StationError::Parse {
            message: e.to_string(),
        })?;

        let mut by_id = HashMap::new();
        for (idx, station) in file.stations.iter().enumerate() {
            if let Some(id) = &station.id {
                // First entry for an id wins
                by_id.entry(id.clone()).or_insert(idx);
            }
        }

        Ok(Self {
            stations: file.stations,
            by_id,
        })
    }

    /// Read and parse a directory file. Blocking.
    pub fn load(path: &Path) -> Result<Self, StationError> {
        let json = std::fs::read_to_string(path).map_err(|source| StationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The shared directory, loading it from `path` on first call.
    ///
    /// Concurrent first calls wait for a single load. Later calls return
    /// the loaded table whatever `path` they pass. A failed load is not
    /// cached, so the next call tries again.
    pub async fn global(path: &Path) -> Result<Arc<StationDirectory>, StationError> {
        DIRECTORY
            .get_or_try_init(|| async {
                let path = path.to_path_buf();
                let directory =
                    tokio::task::spawn_blocking(move || StationDirectory::load(&path)).await??;
                info!(stations = directory.len(), "loaded station directory");
                Ok::<_, StationError>(Arc::new(directory))
            })
            .await
            .cloned()
    }

    pub fn get(&self, id: &str) -> Option<&StationRecord> {
        self.by_id.get(id).map(|&idx| &self.stations[idx])
    }

    /// Station name, or the id itself if the station is unknown.
    pub fn station_name(&self, id: &str) -> String {
        self.get(id)
            .and_then(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn global_id(&self, id: &str) -> Option<&str> {
        self.get(id)?.global_id.as_deref()
    }

    /// Location of the station's first pole.
    pub fn location(&self, id: &str) -> Option<GeoPoint> {
        let location = self.get(id)?.poles.first()?.location.as_ref()?;
        Some(GeoPoint {
            latitude: location.lat?,
            longitude: location.long?,
        })
    }

    /// `(id, "Name (ID: id)")` for every station with both, sorted by name
    /// ignoring case.
    pub fn display_names(&self) -> Vec<(String, String)> {
        let mut named: Vec<(&str, &str)> = self
            .stations
            .iter()
            .filter_map(|s| {
                let id = s.id.as_deref().filter(|id| !id.is_empty())?;
                let name = s.name.as_deref().filter(|n| !n.is_empty())?;
                Some((id, name))
            })
            .collect();
        named.sort_by_cached_key(|(_, name)| name.to_lowercase());

        named
            .into_iter()
            .map(|(id, name)| (id.to_string(), format!("{name} (ID: {id})")))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
