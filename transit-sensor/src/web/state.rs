//! Application state for the web layer.

use std::sync::Arc;

use crate::motis::MotisClient;
use crate::sensor::DepartureSensor;
use crate::stations::StationDirectory;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Every sensor, three per configured station.
    pub sensors: Arc<Vec<DepartureSensor>>,

    /// Motis client used for stop search, when the Motis backend is enabled.
    pub geocoder: Option<Arc<MotisClient>>,

    /// Static station directory, when one is configured.
    pub directory: Option<Arc<StationDirectory>>,
}

impl AppState {
    pub fn new(sensors: Vec<DepartureSensor>) -> Self {
        Self {
            sensors: Arc::new(sensors),
            geocoder: None,
            directory: None,
        }
    }

    pub fn with_geocoder(mut self, geocoder: MotisClient) -> Self {
        self.geocoder = Some(Arc::new(geocoder));
        self
    }

    pub fn with_directory(mut self, directory: Arc<StationDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn sensor(&self, unique_id: &str) -> Option<&DepartureSensor> {
        self.sensors.iter().find(|s| s.unique_id() == unique_id)
    }
}
