//! Runtime layer for Bottle Cap.
//!
//! Wires the health store to the aggregation code: logging and weekly
//! summaries, history with concurrent week deletes, the settings store and
//! the background refresh loop.

pub mod history;
pub mod orchestrator;
pub mod settings_store;
pub mod tracker;

pub use bottlecap_core as core;
pub use bottlecap_data as data;
