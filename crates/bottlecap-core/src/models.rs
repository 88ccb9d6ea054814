use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{BottleCapError, Result};

/// Default weekly drink limit used until the user picks one.
pub const DEFAULT_DRINK_LIMIT: f64 = 6.0;

/// A single logged drink record held by the health store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrinkEntry {
    /// Identifier assigned by the health store.
    pub id: Uuid,
    /// Number of drinks, possibly fractional.
    pub quantity: f64,
    /// Instant the drinks were logged for.
    pub timestamp: DateTime<Utc>,
}

impl DrinkEntry {
    /// Build an entry with a freshly generated id.
    pub fn new(quantity: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            quantity,
            timestamp,
        }
    }
}

/// Day of the week on which every weekly bucket starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeekStartDay {
    Sunday,
    #[default]
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl WeekStartDay {
    /// All seven days, Sunday first.
    pub const ALL: [WeekStartDay; 7] = [
        WeekStartDay::Sunday,
        WeekStartDay::Monday,
        WeekStartDay::Tuesday,
        WeekStartDay::Wednesday,
        WeekStartDay::Thursday,
        WeekStartDay::Friday,
        WeekStartDay::Saturday,
    ];

    /// The matching [`chrono::Weekday`].
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStartDay::Sunday => Weekday::Sun,
            WeekStartDay::Monday => Weekday::Mon,
            WeekStartDay::Tuesday => Weekday::Tue,
            WeekStartDay::Wednesday => Weekday::Wed,
            WeekStartDay::Thursday => Weekday::Thu,
            WeekStartDay::Friday => Weekday::Fri,
            WeekStartDay::Saturday => Weekday::Sat,
        }
    }

    /// Lowercase name, as persisted in the settings file.
    pub fn as_str(self) -> &'static str {
        match self {
            WeekStartDay::Sunday => "sunday",
            WeekStartDay::Monday => "monday",
            WeekStartDay::Tuesday => "tuesday",
            WeekStartDay::Wednesday => "wednesday",
            WeekStartDay::Thursday => "thursday",
            WeekStartDay::Friday => "friday",
            WeekStartDay::Saturday => "saturday",
        }
    }

    /// Capitalised name for display, e.g. `"Monday"`.
    pub fn display_name(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl From<Weekday> for WeekStartDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => WeekStartDay::Sunday,
            Weekday::Mon => WeekStartDay::Monday,
            Weekday::Tue => WeekStartDay::Tuesday,
            Weekday::Wed => WeekStartDay::Wednesday,
            Weekday::Thu => WeekStartDay::Thursday,
            Weekday::Fri => WeekStartDay::Friday,
            Weekday::Sat => WeekStartDay::Saturday,
        }
    }
}

impl FromStr for WeekStartDay {
    type Err = BottleCapError;

    /// Accepts full names and three-letter abbreviations, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        WeekStartDay::ALL
            .into_iter()
            .find(|day| day.as_str() == lower || day.as_str()[..3] == lower)
            .ok_or_else(|| BottleCapError::InvalidWeekday(s.to_string()))
    }
}

impl fmt::Display for WeekStartDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// The two user preferences every aggregation reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekSettings {
    /// First day of each weekly bucket.
    #[serde(default)]
    pub week_start_day: WeekStartDay,
    /// Weekly drink limit, always positive.
    #[serde(default = "default_drink_limit")]
    pub drink_limit: f64,
}

fn default_drink_limit() -> f64 {
    DEFAULT_DRINK_LIMIT
}

impl Default for WeekSettings {
    fn default() -> Self {
        Self {
            week_start_day: WeekStartDay::Monday,
            drink_limit: DEFAULT_DRINK_LIMIT,
        }
    }
}

impl WeekSettings {
    /// Build settings, rejecting a limit that is not a positive finite number.
    pub fn new(week_start_day: WeekStartDay, drink_limit: f64) -> Result<Self> {
        let settings = Self {
            week_start_day,
            drink_limit,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check the limit invariant.
    pub fn validate(&self) -> Result<()> {
        if self.drink_limit.is_finite() && self.drink_limit > 0.0 {
            Ok(())
        } else {
            Err(BottleCapError::InvalidLimit(self.drink_limit))
        }
    }
}

/// Total of all drinks logged on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayTotal {
    pub day: NaiveDate,
    pub total: f64,
}

/// Total of all drinks within one seven-day window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekBucket {
    /// First calendar day of the window, always a week-start day.
    pub bucket_start: NaiveDate,
    pub total: f64,
}

/// Whether the app may read and write drink entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Authorized,
    #[default]
    NotDetermined,
    Denied,
}
