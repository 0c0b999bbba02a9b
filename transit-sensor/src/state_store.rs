//! File-backed store for the last state each sensor exposed.
//!
//! Read once at startup to seed restored snapshots; written by the host
//! after polling. The file maps sensor unique ids to `{state, attributes}`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::RestoredSnapshot;
use crate::domain::Departure;

/// Errors that can occur when writing the state file.
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("failed to write state file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk shape of one entry. Attributes stay loose so an entry written by
/// an older version still restores its state.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    attributes: Option<Value>,
}

/// Snapshot file for sensor state.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all stored snapshots.
    ///
    /// Returns an empty map if the file doesn't exist or is invalid.
    pub fn load(&self) -> HashMap<String, RestoredSnapshot> {
        let Ok(contents) = std::fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        let entries: HashMap<String, StoredEntry> = match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "ignoring invalid state file");
                return HashMap::new();
            }
        };

        entries
            .into_iter()
            .map(|(id, entry)| {
                let attributes = entry
                    .attributes
                    .and_then(|a| serde_json::from_value::<Departure>(a).ok());
                (
                    id,
                    RestoredSnapshot {
                        state: entry.state,
                        attributes,
                    },
                )
            })
            .collect()
    }

    /// Save snapshots, replacing the file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, snapshots: &BTreeMap<String, RestoredSnapshot>) -> Result<(), StateStoreError> {
        let io_error = |source| StateStoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(snapshots)?;
        std::fs::write(&self.path, json).map_err(io_error)?;

        debug!(path = %self.path.display(), entries = snapshots.len(), "saved sensor state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use tempfile::TempDir;

    fn departure() -> Departure {
        Departure {
            departure_time: DateTime::parse_from_rfc3339("2025-03-14T12:05:00+01:00").unwrap(),
            departure_time_local: "12:05".to_string(),
            planned_time: Some("2025-03-14T12:04:00+01:00".to_string()),
            realtime_time: Some("2025-03-14T12:05:00+01:00".to_string()),
            label: "5".to_string(),
            destination: "Weinheim".to_string(),
            cancelled: false,
            platform: "A".to_string(),
            time_until_departure: "5 min".to_string(),
            load_ratio: Some("42%".to_string()),
            load_type: None,
            realtime: true,
            route_color: "#ffffff".to_string(),
            route_text_color: "#000000".to_string(),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("nope.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn invalid_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(StateStore::new(path).load().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        let mut snapshots = BTreeMap::new();
        snapshots.insert(
            "transit_hbf_2417_next".to_string(),
            RestoredSnapshot {
                state: Some(departure().state()),
                attributes: Some(departure()),
            },
        );
        snapshots.insert("transit_hbf_2417_second".to_string(), RestoredSnapshot::default());

        store.save(&snapshots).unwrap();
        let loaded = store.load();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["transit_hbf_2417_next"], snapshots["transit_hbf_2417_next"]);
        assert_eq!(loaded["transit_hbf_2417_second"], RestoredSnapshot::default());
    }

    #[test]
    fn foreign_attributes_keep_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"transit_x_next": {"state": "2025-03-14T12:05:00+01:00", "attributes": {"label": 5}}}"#,
        )
        .unwrap();

        let loaded = StateStore::new(path).load();
        let entry = &loaded["transit_x_next"];
        assert_eq!(entry.state.as_deref(), Some("2025-03-14T12:05:00+01:00"));
        assert_eq!(entry.attributes, None);
    }
}
