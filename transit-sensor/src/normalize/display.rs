//! Display strings derived from a departure.

use chrono::{DateTime, FixedOffset, Utc};

use crate::domain::Locale;

/// Countdowns at or beyond this many minutes show a clock time instead.
const CLOCK_TIME_THRESHOLD_MINUTES: i64 = 60;

const DEFAULT_ROUTE_COLOR: &str = "ffffff";
const DEFAULT_ROUTE_TEXT_COLOR: &str = "000000";

/// Human countdown: "cancelled", a clock time, "N min", or "now".
pub fn time_until_departure(
    departure: &DateTime<FixedOffset>,
    cancelled: bool,
    now: DateTime<Utc>,
    locale: &Locale,
) -> String {
    if cancelled {
        return locale.language.cancelled().to_string();
    }

    let seconds = (departure.with_timezone(&Utc) - now).num_seconds();
    let minutes = seconds.div_euclid(60).max(0);

    if minutes >= CLOCK_TIME_THRESHOLD_MINUTES {
        locale.clock_time(departure)
    } else if minutes > 0 {
        format!("{minutes} min")
    } else {
        locale.language.now().to_string()
    }
}

/// Occupancy fraction as a whole percentage, rounding half to even.
pub fn load_ratio(ratio: f64) -> Option<String> {
    ratio
        .is_finite()
        .then(|| format!("{}%", (ratio * 100.0).round_ties_even() as i64))
}

/// Display text for a capacity code. Unknown codes have none.
pub fn capacity_label(code: &str) -> Option<&'static str> {
    match code {
        "NA" => Some("Nicht vorhanden"),
        "I" => Some("I - empty - leer"),
        "II" => Some("II - light - mittel-voll"),
        "III" => Some("III - full - voll"),
        _ => None,
    }
}

pub fn route_color(value: Option<&str>) -> String {
    hex_color(value, DEFAULT_ROUTE_COLOR)
}

pub fn route_text_color(value: Option<&str>) -> String {
    hex_color(value, DEFAULT_ROUTE_TEXT_COLOR)
}

fn hex_color(value: Option<&str>, default: &str) -> String {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default);
    if value.starts_with('#') {
        value.to_string()
    } else {
        format!("#{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Language;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap()
    }

    fn at(offset: Duration) -> DateTime<FixedOffset> {
        (now() + offset).fixed_offset()
    }

    fn german() -> Locale {
        Locale::new(Language::German, chrono_tz::Europe::Berlin)
    }

    #[test]
    fn countdown_minutes() {
        let locale = Locale::default();
        assert_eq!(
            time_until_departure(&at(Duration::minutes(7)), false, now(), &locale),
            "7 min"
        );
        assert_eq!(
            time_until_departure(&at(Duration::seconds(119)), false, now(), &locale),
            "1 min"
        );
        assert_eq!(
            time_until_departure(&at(Duration::seconds(59)), false, now(), &locale),
            "now"
        );
        assert_eq!(
            time_until_departure(&at(Duration::minutes(-3)), false, now(), &german()),
            "sofort"
        );
    }

    #[test]
    fn countdown_switches_to_clock_time() {
        // 11:00 UTC is 13:00 CEST
        assert_eq!(
            time_until_departure(&at(Duration::minutes(60)), false, now(), &german()),
            "13:00"
        );
        assert_eq!(
            time_until_departure(&at(Duration::seconds(3599)), false, now(), &german()),
            "59 min"
        );
    }

    #[test]
    fn cancelled_overrides_countdown() {
        assert_eq!(
            time_until_departure(&at(Duration::minutes(5)), true, now(), &german()),
            "entfällt"
        );
        assert_eq!(
            time_until_departure(&at(Duration::minutes(-30)), true, now(), &Locale::default()),
            "cancelled"
        );
    }

    #[test]
    fn load_ratio_rounds_half_even() {
        assert_eq!(load_ratio(0.42).as_deref(), Some("42%"));
        assert_eq!(load_ratio(0.125).as_deref(), Some("12%"));
        assert_eq!(load_ratio(1.0).as_deref(), Some("100%"));
        assert_eq!(load_ratio(f64::NAN), None);
    }

    #[test]
    fn capacity_table() {
        assert_eq!(capacity_label("NA"), Some("Nicht vorhanden"));
        assert_eq!(capacity_label("III"), Some("III - full - voll"));
        assert_eq!(capacity_label("IV"), None);
        assert_eq!(capacity_label(""), None);
    }

    #[test]
    fn colors_are_prefixed_once() {
        assert_eq!(route_color(None), "#ffffff");
        assert_eq!(route_text_color(None), "#000000");
        assert_eq!(route_color(Some("")), "#ffffff");
        assert_eq!(route_color(Some("ff0000")), "#ff0000");
        assert_eq!(route_color(Some("#00ff00")), "#00ff00");
    }
}
