//! Query time windows.

use chrono::{DateTime, Duration, DurationRound, Utc};

use crate::domain::Locale;

/// Span used by backends that only take a start time.
const FIXED_SPAN_HOURS: i64 = 1;

/// Span used by the GraphQL backend during the day.
const DAY_SPAN_HOURS: i64 = 2;

/// Span used by the GraphQL backend between local midnight and 4 AM,
/// when service is sparse.
const NIGHT_SPAN_HOURS: i64 = 5;

/// Local hour at which the night span stops applying.
const NIGHT_END_HOUR: u32 = 4;

/// How a backend wants its query window sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// A small fixed window starting now.
    Fixed,
    /// Wider at night, narrower during the day.
    Dynamic,
}

/// The time range a fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    /// Compute the window for `now`. The start is truncated to the minute.
    pub fn for_policy(policy: WindowPolicy, now: DateTime<Utc>, locale: &Locale) -> Self {
        let start = now.duration_trunc(Duration::minutes(1)).unwrap_or(now);

        let hours = match policy {
            WindowPolicy::Fixed => FIXED_SPAN_HOURS,
            WindowPolicy::Dynamic if locale.local_hour(now) < NIGHT_END_HOUR => NIGHT_SPAN_HOURS,
            WindowPolicy::Dynamic => DAY_SPAN_HOURS,
        };

        Self {
            start,
            end: start + Duration::hours(hours),
        }
    }

    /// Start formatted as the backends expect (`2025-03-14T12:00:00Z`).
    pub fn start_param(&self) -> String {
        format_utc(self.start)
    }

    pub fn end_param(&self) -> String {
        format_utc(self.end)
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

fn format_utc(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Language;
    use chrono::TimeZone;

    fn berlin() -> Locale {
        Locale::new(Language::German, chrono_tz::Europe::Berlin)
    }

    #[test]
    fn start_is_truncated_to_minute() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 12, 34, 56).unwrap();
        let window = QueryWindow::for_policy(WindowPolicy::Fixed, now, &berlin());
        assert_eq!(window.start_param(), "2025-03-14T12:34:00Z");
        assert_eq!(window.span(), Duration::hours(1));
    }

    #[test]
    fn dynamic_window_is_two_hours_by_day() {
        // 13:00 local (CET)
        let now = Utc.with_ymd_and_hms(2025, 1, 14, 12, 0, 0).unwrap();
        let window = QueryWindow::for_policy(WindowPolicy::Dynamic, now, &berlin());
        assert_eq!(window.span(), Duration::hours(2));
        assert_eq!(window.end_param(), "2025-01-14T14:00:00Z");
    }

    #[test]
    fn dynamic_window_is_five_hours_at_night() {
        // 00:30 local (CET)
        let now = Utc.with_ymd_and_hms(2025, 1, 13, 23, 30, 0).unwrap();
        let window = QueryWindow::for_policy(WindowPolicy::Dynamic, now, &berlin());
        assert_eq!(window.span(), Duration::hours(5));

        // 03:59 local is still night
        let now = Utc.with_ymd_and_hms(2025, 1, 14, 2, 59, 0).unwrap();
        let window = QueryWindow::for_policy(WindowPolicy::Dynamic, now, &berlin());
        assert_eq!(window.span(), Duration::hours(5));

        // 04:00 local is day again
        let now = Utc.with_ymd_and_hms(2025, 1, 14, 3, 0, 0).unwrap();
        let window = QueryWindow::for_policy(WindowPolicy::Dynamic, now, &berlin());
        assert_eq!(window.span(), Duration::hours(2));
    }
}
