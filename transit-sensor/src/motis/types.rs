//! Typed views of Motis geocoding responses.
//!
//! Departures are not typed here; they stay as JSON until the normalizer
//! picks them apart entry by entry.

use serde::{Deserialize, Serialize};

/// One geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopMatch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// `STOP`, `ADDRESS` or `PLACE`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl StopMatch {
    /// Pull the usable matches out of a geocode response.
    ///
    /// Entries without an id or name are skipped rather than failing the
    /// whole list.
    pub fn from_response(value: &serde_json::Value) -> Vec<StopMatch> {
        value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<StopMatch>(item.clone()).ok())
                    .filter(|m| !m.id.is_empty() && !m.name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether this match is a transit stop rather than an address.
    pub fn is_stop(&self) -> bool {
        self.kind.as_deref().is_none_or(|k| k.eq_ignore_ascii_case("STOP"))
    }
}
