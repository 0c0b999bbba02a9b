//! Public-transport departure sensors.
//!
//! Polls a Motis or RNV backend per configured station, normalizes the
//! departures, and exposes the next three as sensors whose state survives
//! backend outages and restarts.

pub mod auth;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod motis;
pub mod normalize;
pub mod rnv;
pub mod sensor;
pub mod source;
pub mod state_store;
pub mod stations;
pub mod web;
