//! Motis REST client.
//!
//! Motis is an open journey planner; public instances such as Transitous
//! serve a JSON API without authentication. The sensors only need two
//! things from it:
//! - `v5/stoptimes` for the departures at a stop
//! - `v1/geocode` / `v1/reverse-geocode` to find stops and check the URL

mod client;
mod types;

pub use client::{DEFAULT_BASE_URL, MotisClient, MotisConfig, normalize_base_url};
pub use types::StopMatch;
