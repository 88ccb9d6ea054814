use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by Bottle Cap.
#[derive(Error, Debug)]
pub enum BottleCapError {
    /// The user declined access to the health data store.
    #[error("Access to health data was denied; allow it in the system privacy settings")]
    AuthorizationDenied,

    /// Access to the health data store has not been requested yet.
    #[error("Access to health data has not been requested yet")]
    AuthorizationIndeterminate,

    /// Creating a drink entry in the health store failed.
    #[error("Failed to save drinks: {0}")]
    Write(String),

    /// Deleting drink entries from the health store failed.
    #[error("Failed to delete drinks: {0}")]
    Delete(String),

    /// Reading drink entries from the health store failed.
    #[error("Failed to read drinks: {0}")]
    Query(String),

    /// Some of the per-day deletes issued for a week did not succeed.
    #[error("Failed to delete drinks for {}", format_days(.failed))]
    PartialBatchFailure { failed: Vec<NaiveDate> },

    /// A week-start day name could not be parsed.
    #[error("Invalid week start day: {0}")]
    InvalidWeekday(String),

    /// A drink quantity outside the accepted range.
    #[error("Invalid number of drinks: {0}")]
    InvalidQuantity(f64),

    /// A weekly limit that is not a positive number.
    #[error("Invalid weekly drink limit: {0}")]
    InvalidLimit(f64),

    /// Drinks cannot be logged against a day that has not happened yet.
    #[error("Cannot log drinks for a future date: {0}")]
    FutureDate(NaiveDate),

    /// A store file could not be opened or written.
    #[error("Failed to access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A command-line option holds a value that cannot be used.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BottleCapError {
    /// Whether the error comes from the health store rejecting access.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationDenied | Self::AuthorizationIndeterminate
        )
    }
}

fn format_days(days: &[NaiveDate]) -> String {
    days.iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias used throughout the Bottle Cap crates.
pub type Result<T> = std::result::Result<T, BottleCapError>;
