//! Normalized departure record.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One upcoming departure, as exposed in sensor attributes.
///
/// `planned_time` and `realtime_time` are the backend's own strings, passed
/// through for display. `departure_time` is the parsed realtime time, or the
/// planned time when no realtime estimate exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    pub departure_time: DateTime<FixedOffset>,
    /// Local `HH:MM` of `departure_time`.
    pub departure_time_local: String,
    pub planned_time: Option<String>,
    pub realtime_time: Option<String>,
    /// Line label, e.g. "5" or "RE 10".
    pub label: String,
    pub destination: String,
    pub cancelled: bool,
    pub platform: String,
    /// Countdown such as "7 min", a clock time, "now", or "cancelled".
    pub time_until_departure: String,
    /// Occupancy as a percentage string, e.g. "42%".
    pub load_ratio: Option<String>,
    pub load_type: Option<String>,
    pub realtime: bool,
    pub route_color: String,
    pub route_text_color: String,
}

impl Departure {
    /// Sensor state string: the departure time in RFC 3339.
    pub fn state(&self) -> String {
        self.departure_time.to_rfc3339()
    }

    /// Identity used when merging results from several sources.
    pub fn identity(&self) -> (DateTime<FixedOffset>, &str, &str) {
        (self.departure_time, &self.label, &self.platform)
    }
}
