//! Backend response shapes.
//!
//! Every field is optional: the backends omit fields freely, and one odd
//! entry must not take the rest of the list down with it. Entries are
//! deserialized one at a time by the extractor.

use serde::Deserialize;

/// One element of a Motis `stopTimes` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopTime {
    pub place: Option<Place>,
    pub display_name: Option<String>,
    pub headsign: Option<String>,
    pub cancelled: Option<bool>,
    pub trip_cancelled: Option<bool>,
    pub real_time: Option<bool>,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Place {
    pub track: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub scheduled_departure: Option<String>,
    pub scheduled_arrival: Option<String>,
}

/// One element of a GraphQL `journeys.elements` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Journey {
    pub line: Option<Line>,
    pub loads: Option<Vec<Load>>,
    pub cancelled: Option<bool>,
    pub stops: Option<Vec<JourneyStop>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Line {
    pub line_group: Option<Labelled>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Labelled {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Load {
    pub ratio: Option<f64>,
    pub load_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JourneyStop {
    pub planned_departure: Option<IsoTime>,
    pub realtime_departure: Option<IsoTime>,
    pub destination_label: Option<String>,
    pub pole: Option<Pole>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IsoTime {
    pub iso_string: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pole {
    pub platform: Option<Labelled>,
}
