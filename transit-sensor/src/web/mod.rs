//! Web layer for the departure sensors.
//!
//! Exposes the sensor readings as JSON, plus stop search for configuring
//! new stations.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
