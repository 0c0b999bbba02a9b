//! Map both backend schemas onto `RawDeparture`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use super::schema::{Journey, StopTime};

/// Destination labels the GraphQL backend uses for cancelled stops,
/// compared trimmed and case-insensitively.
const CANCELLATION_KEYWORDS: &[&str] = &["entfällt", "fällt aus", "cancelled", "canceled"];

/// One departure row before filtering, in a schema-independent shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDeparture {
    pub scheduled: Option<String>,
    pub estimated: Option<String>,
    pub platform: String,
    pub line: String,
    pub destination: String,
    pub cancelled: bool,
    pub load_ratio: Option<f64>,
    pub load_type: Option<String>,
    pub realtime: bool,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
}

/// Rows of a Motis stop-times response, or `None` if `stopTimes` is missing.
pub fn stop_times(payload: &Value) -> Option<Vec<RawDeparture>> {
    let entries = payload.get("stopTimes")?.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(element::<StopTime>)
            .map(from_stop_time)
            .collect(),
    )
}

/// Rows of a GraphQL station response, one per journey stop, or `None` if
/// the journeys list is missing.
pub fn station_journeys(payload: &Value) -> Option<Vec<RawDeparture>> {
    let entries = payload
        .pointer("/data/station/journeys/elements")?
        .as_array()?;
    Some(
        entries
            .iter()
            .filter_map(element::<Journey>)
            .flat_map(from_journey)
            .collect(),
    )
}

fn element<T: DeserializeOwned>(value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            trace!(error = %e, "skipping malformed entry");
            None
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

fn from_stop_time(stop: StopTime) -> RawDeparture {
    let place = stop.place.unwrap_or_default();

    RawDeparture {
        scheduled: non_empty(place.scheduled_departure).or(non_empty(place.scheduled_arrival)),
        estimated: non_empty(place.departure).or(non_empty(place.arrival)),
        platform: place.track.unwrap_or_default(),
        line: stop.display_name.unwrap_or_default(),
        destination: stop.headsign.unwrap_or_default(),
        cancelled: stop.cancelled.unwrap_or(false) || stop.trip_cancelled.unwrap_or(false),
        load_ratio: None,
        load_type: None,
        realtime: stop.real_time.unwrap_or(false),
        route_color: stop.route_color,
        route_text_color: stop.route_text_color,
    }
}

fn from_journey(journey: Journey) -> Vec<RawDeparture> {
    let line = journey
        .line
        .and_then(|l| l.line_group)
        .and_then(|g| g.label)
        .unwrap_or_default();
    let load = journey.loads.and_then(|loads| loads.into_iter().next());
    let flagged = journey.cancelled.unwrap_or(false);

    journey
        .stops
        .unwrap_or_default()
        .into_iter()
        .map(|stop| {
            let destination = stop.destination_label.unwrap_or_default();
            let estimated = non_empty(stop.realtime_departure.and_then(|t| t.iso_string));

            RawDeparture {
                scheduled: non_empty(stop.planned_departure.and_then(|t| t.iso_string)),
                realtime: estimated.is_some(),
                estimated,
                platform: stop
                    .pole
                    .and_then(|p| p.platform)
                    .and_then(|p| p.label)
                    .unwrap_or_default(),
                line: line.clone(),
                cancelled: flagged || is_cancellation_label(&destination),
                destination,
                load_ratio: load.as_ref().and_then(|l| l.ratio),
                load_type: load.as_ref().and_then(|l| l.load_type.clone()),
                route_color: None,
                route_text_color: None,
            }
        })
        .collect()
}

/// Whether a destination label is really a cancellation notice.
pub fn is_cancellation_label(label: &str) -> bool {
    let label = label.trim().to_lowercase();
    CANCELLATION_KEYWORDS.iter().any(|k| label == *k)
}
