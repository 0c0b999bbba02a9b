//! Static station directory.
//!
//! A read-only JSON table of stations (id, name, global id, pole
//! locations) shipped alongside the service. It is loaded at most once per
//! process and used to name stations and to list them for search.

mod directory;
mod error;

pub use directory::{GeoPoint, StationDirectory, StationRecord};
pub use error::StationError;
