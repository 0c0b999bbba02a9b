//! Departure normalizer.
//!
//! Turns a raw backend payload into the ordered list of departures the
//! sensors expose. The steps are:
//!
//! 1. Extract schema-specific rows into `RawDeparture`s. A missing list is
//!    a malformed payload and yields `None`.
//! 2. Drop rows flagged invalid by the backend, then apply the platform,
//!    line and destination filters.
//! 3. Pick the realtime time, else the planned time; drop rows where
//!    neither parses.
//! 4. Admit rows no older than the admission window, and all cancelled
//!    rows regardless of age.
//! 5. Sort by departure time. The sort is stable, so equal times keep
//!    backend order.
//!
//! An empty result is a valid answer ("nothing upcoming"), distinct from
//! `None`.

mod display;
mod extract;
mod schema;

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::{Departure, Locale, Slot, StationQuery, is_admissible, parse_timestamp};
use crate::source::RawPayload;

pub use display::{capacity_label, load_ratio, time_until_departure};
pub use extract::{RawDeparture, is_cancellation_label};

/// Marker the backends put into destination labels of broken legs.
pub const INVALID_LEG_MARKER: char = '\u{FFFD}';

/// Normalize a payload into sorted departures.
///
/// Returns `None` when the payload does not have the expected structure.
pub fn normalize(
    payload: &RawPayload,
    query: &StationQuery,
    now: DateTime<Utc>,
    locale: &Locale,
) -> Option<Vec<Departure>> {
    let mut departures = match payload {
        RawPayload::Merged(parts) => merge_parts(parts, query, now, locale)?,
        single => admit(rows(single)?, query, now, locale),
    };

    departures.sort_by_key(|d| d.departure_time);
    Some(departures)
}

/// Departure in `slot`, if the cycle produced that many.
pub fn slot(departures: &[Departure], slot: Slot) -> Option<&Departure> {
    departures.get(slot.index())
}

fn rows(payload: &RawPayload) -> Option<Vec<RawDeparture>> {
    match payload {
        RawPayload::StopTimes(value) => extract::stop_times(value),
        RawPayload::StationJourneys(value) => extract::station_journeys(value),
        RawPayload::Merged(_) => None,
    }
}

/// Normalize each part on its own and concatenate. Entries a previous part
/// already reported are dropped; duplicates within one part are kept.
///
/// `None` only if every part is malformed.
fn merge_parts(
    parts: &[RawPayload],
    query: &StationQuery,
    now: DateTime<Utc>,
    locale: &Locale,
) -> Option<Vec<Departure>> {
    let mut merged: Vec<Departure> = Vec::new();
    let mut any_valid = false;

    for part in parts {
        let Some(part_departures) = normalize(part, query, now, locale) else {
            continue;
        };
        any_valid = true;

        let seen: HashSet<_> = merged
            .iter()
            .map(|d| (d.departure_time, d.label.clone(), d.platform.clone()))
            .collect();

        merged.extend(part_departures.into_iter().filter(|d| {
            !seen.contains(&(d.departure_time, d.label.clone(), d.platform.clone()))
        }));
    }

    any_valid.then_some(merged)
}

fn admit(
    rows: Vec<RawDeparture>,
    query: &StationQuery,
    now: DateTime<Utc>,
    locale: &Locale,
) -> Vec<Departure> {
    rows.into_iter()
        .filter(|row| !row.destination.contains(INVALID_LEG_MARKER))
        .filter(|row| query.accepts(&row.platform, &row.line, &row.destination))
        .filter_map(|row| to_departure(row, now, locale))
        .collect()
}

fn to_departure(row: RawDeparture, now: DateTime<Utc>, locale: &Locale) -> Option<Departure> {
    let raw_time = row.estimated.as_deref().or(row.scheduled.as_deref())?;
    let departure_time = parse_timestamp(raw_time)?;

    if !row.cancelled && !is_admissible(&departure_time, now) {
        return None;
    }

    Some(Departure {
        departure_time_local: locale.clock_time(&departure_time),
        time_until_departure: time_until_departure(&departure_time, row.cancelled, now, locale),
        departure_time,
        planned_time: row.scheduled,
        realtime_time: row.estimated,
        label: row.line,
        destination: row.destination,
        cancelled: row.cancelled,
        platform: row.platform,
        load_ratio: row.load_ratio.and_then(load_ratio),
        load_type: row
            .load_type
            .as_deref()
            .and_then(capacity_label)
            .map(str::to_string),
        realtime: row.realtime,
        route_color: display::route_color(row.route_color.as_deref()),
        route_text_color: display::route_text_color(row.route_text_color.as_deref()),
    })
}
