//! Display language and time zone.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use chrono_tz::Tz;

/// Language used for the few strings the sensors render themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    German,
    English,
}

impl Language {
    /// Pick a language from a host language code such as `de-DE` or `en`.
    /// Anything that is not German falls back to English.
    pub fn from_code(code: &str) -> Self {
        if code.trim().to_lowercase().starts_with("de") {
            Language::German
        } else {
            Language::English
        }
    }

    /// Label shown instead of a countdown for cancelled departures.
    pub fn cancelled(self) -> &'static str {
        match self {
            Language::German => "entfällt",
            Language::English => "cancelled",
        }
    }

    /// Label shown when a departure is due.
    pub fn now(self) -> &'static str {
        match self {
            Language::German => "sofort",
            Language::English => "now",
        }
    }
}

/// Language plus the local time zone used for clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub language: Language,
    pub timezone: Tz,
}

impl Locale {
    pub fn new(language: Language, timezone: Tz) -> Self {
        Self { language, timezone }
    }

    /// Format a departure as local `HH:MM`.
    pub fn clock_time(&self, time: &DateTime<FixedOffset>) -> String {
        time.with_timezone(&self.timezone).format("%H:%M").to_string()
    }

    /// Local hour of day (0-23) at `now`.
    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        now.with_timezone(&self.timezone).hour()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            language: Language::English,
            timezone: chrono_tz::Europe::Berlin,
        }
    }
}
