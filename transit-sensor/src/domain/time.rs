//! Timestamp parsing and the admission window.
//!
//! Both backends send RFC 3339 timestamps with an offset. A departure whose
//! time lies up to five minutes in the past is still considered current.

use chrono::{DateTime, Duration, FixedOffset, Utc};

/// How far in the past (minutes) a departure may lie and still be shown.
pub const ADMISSION_WINDOW_MINUTES: i64 = 5;

/// The admission window as a duration.
pub fn admission_window() -> Duration {
    Duration::minutes(ADMISSION_WINDOW_MINUTES)
}

/// Parse a backend timestamp, returning `None` for anything that is not
/// RFC 3339 with an offset.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s).ok()
}

/// Whether `time` is at or after `now` minus the admission window.
pub fn is_admissible(time: &DateTime<FixedOffset>, now: DateTime<Utc>) -> bool {
    time.with_timezone(&Utc) >= now - admission_window()
}
