//! Core types and pure computations for Bottle Cap.
//!
//! Holds the drink and settings models, the error taxonomy, display rounding,
//! week anchoring in a timezone-aware calendar, and the weekly limit
//! arithmetic. Nothing here performs I/O except the settings file helpers.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{BottleCapError, Result};
