//! Sensor facade: three positional sensors per station.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::cache::{Provenance, RestoredSnapshot, StationSnapshot};
use crate::domain::{Departure, Slot, StationQuery};

/// What a sensor reports to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    /// Departure time in RFC 3339, or absent.
    pub state: Option<String>,
    pub attributes: Option<Departure>,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl SensorReading {
    /// The part of a reading the host persists across restarts.
    pub fn to_snapshot(&self) -> RestoredSnapshot {
        RestoredSnapshot {
            state: self.state.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// One departure slot of one station.
#[derive(Debug, Clone)]
pub struct DepartureSensor {
    unique_id: String,
    station_id: String,
    device_name: String,
    slot: Slot,
    snapshots: watch::Receiver<StationSnapshot>,
}

impl DepartureSensor {
    pub fn new(query: &StationQuery, slot: Slot, snapshots: watch::Receiver<StationSnapshot>) -> Self {
        Self {
            unique_id: unique_id(query, slot),
            station_id: query.station_id().to_string(),
            device_name: device_name(query),
            slot,
            snapshots,
        }
    }

    /// The next, second and third departure sensors for a station.
    pub fn for_station(
        query: &StationQuery,
        snapshots: &watch::Receiver<StationSnapshot>,
    ) -> Vec<DepartureSensor> {
        Slot::ALL
            .into_iter()
            .map(|slot| DepartureSensor::new(query, slot, snapshots.clone()))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        self.slot.sensor_name()
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    /// Name of the device grouping this station's sensors.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Current reading, resolved against `now`.
    pub fn reading(&self, now: DateTime<Utc>) -> SensorReading {
        let snapshot = self.snapshots.borrow();
        let resolved = snapshot.slot(self.slot).resolve(now);
        let available = snapshot.available(self.slot, now);

        match resolved {
            Some(r) => SensorReading {
                state: Some(r.state),
                attributes: r.attributes,
                available,
                provenance: Some(r.provenance),
            },
            None => SensorReading {
                state: None,
                attributes: None,
                available,
                provenance: None,
            },
        }
    }
}

/// Stable id for a station/filter/slot combination, e.g.
/// `transit_mannheim_hbf_a_5_2417_next`.
pub fn unique_id(query: &StationQuery, slot: Slot) -> String {
    let mut parts = vec!["transit", query.display_name()];
    parts.extend(query.platform());
    parts.extend(query.line());
    parts.extend(query.destination_filter().map(|r| r.as_str()));
    parts.push(query.station_id());
    parts.push(slot.id_suffix());

    slugify(&parts.join("_"))
}

fn device_name(query: &StationQuery) -> String {
    let mut name = format!("{} ({})", query.display_name(), query.station_id());
    if let Some(platform) = query.platform() {
        name.push_str(&format!(" - {platform}"));
    }
    if let Some(line) = query.line() {
        name.push_str(&format!(" - '{line}'"));
    }
    if let Some(radius) = query.radius() {
        name.push_str(&format!(" - r:{radius}"));
    }
    name
}

/// Lowercase, with runs of anything non-alphanumeric collapsed to `_`.
fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    fn departure(offset_minutes: i64) -> Departure {
        Departure {
            departure_time: (now() + Duration::minutes(offset_minutes)).fixed_offset(),
            departure_time_local: String::new(),
            planned_time: None,
            realtime_time: None,
            label: "5".to_string(),
            destination: "X".to_string(),
            cancelled: false,
            platform: "A".to_string(),
            time_until_departure: String::new(),
            load_ratio: None,
            load_type: None,
            realtime: true,
            route_color: "#ffffff".to_string(),
            route_text_color: "#000000".to_string(),
        }
    }

    #[test]
    fn unique_id_includes_filters() {
        let query = StationQuery::new("2417")
            .unwrap()
            .with_name("Mannheim Hbf")
            .with_platform("A")
            .with_line("5");
        assert_eq!(
            unique_id(&query, Slot::NEXT),
            "transit_mannheim_hbf_a_5_2417_next"
        );

        let bare = StationQuery::new("de:08222:2417").unwrap();
        assert_eq!(
            unique_id(&bare, Slot::THIRD),
            "transit_de_08222_2417_de_08222_2417_third"
        );
    }

    #[test]
    fn unique_id_distinguishes_destination_filters() {
        let query = |pattern: &str| {
            StationQuery::new("2417")
                .unwrap()
                .with_name("Mannheim Hbf")
                .with_destination_filter(pattern)
                .unwrap()
        };

        let north = unique_id(&query("Weinheim|Heddesheim"), Slot::NEXT);
        let south = unique_id(&query("Heidelberg"), Slot::NEXT);
        assert_eq!(north, "transit_mannheim_hbf_weinheim_heddesheim_2417_next");
        assert_eq!(south, "transit_mannheim_hbf_heidelberg_2417_next");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Käfertal -- Bahnhof!"), "käfertal_bahnhof");
        assert_eq!(slugify("__a__"), "a");
    }

    #[test]
    fn device_name_lists_filters() {
        let query = StationQuery::new("2417")
            .unwrap()
            .with_name("Hbf")
            .with_platform("A")
            .with_radius(50);
        assert_eq!(device_name(&query), "Hbf (2417) - A - r:50");
    }

    #[test]
    fn sensors_read_their_own_slot() {
        let query = StationQuery::new("2417").unwrap();
        let mut snapshot = StationSnapshot::new();
        snapshot.absorb_departures(&[departure(2), departure(5)], now());
        let (tx, rx) = watch::channel(snapshot);

        let sensors = DepartureSensor::for_station(&query, &rx);
        assert_eq!(sensors.len(), 3);
        assert_eq!(sensors[1].name(), "Second Departure");

        let second = sensors[1].reading(now());
        assert_eq!(second.state, Some(departure(5).state()));
        assert!(second.available);
        assert_eq!(second.provenance, Some(Provenance::Fresh));

        let third = sensors[2].reading(now());
        assert_eq!(third.state, None);
        assert!(!third.available);

        // readers see what the coordinator publishes next
        let mut next = tx.borrow().clone();
        next.absorb_fault(true);
        tx.send_replace(next);
        assert!(!sensors[0].reading(now()).available);
        assert!(sensors[0].reading(now()).state.is_some());
    }

    #[test]
    fn reading_round_trips_to_snapshot() {
        let reading = SensorReading {
            state: Some(departure(1).state()),
            attributes: Some(departure(1)),
            available: true,
            provenance: Some(Provenance::Cached),
        };
        let snapshot = reading.to_snapshot();
        assert_eq!(snapshot.state, reading.state);
        assert_eq!(snapshot.attributes, reading.attributes);
    }
}
