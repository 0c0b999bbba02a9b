//! Domain types for the departure sensors.
//!
//! These types are validated at construction time: a `StationQuery` always
//! carries a non-empty station id and a compiled destination filter, and a
//! `Slot` is always one of the three exposed positions.

mod departure;
mod locale;
mod query;
mod slot;
mod time;

pub use departure::Departure;
pub use locale::{Language, Locale};
pub use query::{InvalidQuery, StationQuery};
pub use slot::Slot;
pub use time::{ADMISSION_WINDOW_MINUTES, admission_window, is_admissible, parse_timestamp};
