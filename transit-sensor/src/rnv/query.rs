//! GraphQL query text.

use crate::source::QueryWindow;

/// Maximum journeys requested per station.
const JOURNEYS_PER_REQUEST: u32 = 50;

/// Build the `station { journeys }` query for one station and window.
///
/// Loads and stops are restricted to the station itself so each journey
/// carries exactly the stop we are departing from.
pub fn station_journeys(station_id: &str, window: &QueryWindow) -> String {
    let id = quoted(station_id);
    let start = quoted(&window.start_param());
    let end = quoted(&window.end_param());

    format!(
        r#"query {{
  station(id: {id}) {{
    hafasID
    longName
    journeys(startTime: {start}, endTime: {end}, first: {JOURNEYS_PER_REQUEST}) {{
      totalCount
      elements {{
        ... on Journey {{
          line {{ lineGroup {{ label }} }}
          loads(onlyHafasID: {id}) {{ ratio loadType }}
          cancelled
          stops(onlyHafasID: {id}) {{
            plannedDeparture {{ isoString }}
            realtimeDeparture {{ isoString }}
            destinationLabel
            pole {{ platform {{ label }} }}
          }}
        }}
      }}
    }}
  }}
}}"#
    )
}

/// GraphQL string literal. JSON string escaping is a valid subset.
fn quoted(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
