//! Data layer for Bottle Cap.
//!
//! Defines the health-store boundary, ships an in-memory and a JSON-file
//! store, and turns raw drink entries into daily and weekly history buckets.

pub mod aggregator;
pub mod json_store;
pub mod store;

pub use bottlecap_core as core;
