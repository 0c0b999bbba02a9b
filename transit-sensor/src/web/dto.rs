//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::cache::Provenance;
use crate::domain::Departure;
use crate::motis::StopMatch;
use crate::sensor::{DepartureSensor, SensorReading};
use crate::stations::GeoPoint;

/// A sensor and its current reading.
#[derive(Debug, Serialize)]
pub struct SensorView {
    pub unique_id: String,

    /// "Next Departure", "Second Departure" or "Third Departure"
    pub name: String,

    pub device_name: String,
    pub station_id: String,

    /// Departure time in RFC 3339, absent when unknown
    pub state: Option<String>,

    pub attributes: Option<Departure>,
    pub available: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl SensorView {
    pub fn from_reading(sensor: &DepartureSensor, reading: SensorReading) -> Self {
        Self {
            unique_id: sensor.unique_id().to_string(),
            name: sensor.name().to_string(),
            device_name: sensor.device_name().to_string(),
            station_id: sensor.station_id().to_string(),
            state: reading.state,
            attributes: reading.attributes,
            available: reading.available,
            provenance: reading.provenance,
        }
    }
}

/// All sensors.
#[derive(Debug, Serialize)]
pub struct SensorListResponse {
    pub sensors: Vec<SensorView>,
}

/// Request to search stops by name.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    /// Search text
    pub q: String,

    /// Maximum results (default 10, max 50)
    pub limit: Option<usize>,
}

/// A stop search hit.
#[derive(Debug, Serialize)]
pub struct StationSearchResult {
    pub id: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl From<StopMatch> for StationSearchResult {
    fn from(m: StopMatch) -> Self {
        Self {
            id: m.id,
            name: m.name,
            lat: m.lat,
            lon: m.lon,
        }
    }
}

/// Response for stop search.
#[derive(Debug, Serialize)]
pub struct StationSearchResponse {
    pub stations: Vec<StationSearchResult>,
}

/// An entry of the static station directory.
#[derive(Debug, Serialize)]
pub struct DirectoryEntry {
    pub id: String,

    /// "Name (ID: id)"
    pub label: String,

    /// Network-wide stop id, e.g. "de:08222:2417"
    pub global_id: Option<String>,

    /// Position of the station's first pole
    pub location: Option<GeoPoint>,
}

/// Response for the station directory listing.
#[derive(Debug, Serialize)]
pub struct DirectoryResponse {
    pub stations: Vec<DirectoryEntry>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
