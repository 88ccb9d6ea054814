use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::formatting::{format_rounded, rounded_value};
use crate::models::{DrinkEntry, WeekSettings};
use crate::time_utils::Calendar;

// ── Limit arithmetic ──────────────────────────────────────────────────────────

/// Drinks left before the weekly limit is reached.
///
/// Uses the rounded total, so a displayed `5.96` counts as `6`.
pub fn remaining(total: f64, limit: f64) -> f64 {
    (limit - rounded_value(total)).max(0.0)
}

/// Drinks logged beyond the weekly limit.
///
/// Unlike [`remaining`] this works on the unrounded total.
pub fn over_limit(total: f64, limit: f64) -> f64 {
    (total - limit).max(0.0)
}

/// Whether logging has reached or passed the limit, on the unrounded total.
pub fn is_limit_hit(total: f64, limit: f64) -> bool {
    total >= limit
}

/// Fraction of the limit used, for progress fills. May exceed `1.0`.
pub fn progress(total: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        return 0.0;
    }
    rounded_value(total) / limit
}

// ── LimitStatus ───────────────────────────────────────────────────────────────

/// Where a weekly total stands relative to the limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LimitStatus {
    Under { remaining: f64 },
    Reached,
    Over { over: f64 },
}

impl LimitStatus {
    pub fn evaluate(total: f64, limit: f64) -> Self {
        let left = remaining(total, limit);
        if left > 0.0 {
            LimitStatus::Under { remaining: left }
        } else if rounded_value(total) == limit {
            LimitStatus::Reached
        } else {
            LimitStatus::Over {
                over: over_limit(total, limit),
            }
        }
    }

    /// Sentence shown under the weekly total.
    pub fn message(&self) -> String {
        match self {
            LimitStatus::Under { remaining } => {
                format!("{} more until you reach your limit.", format_rounded(*remaining))
            }
            LimitStatus::Reached => "You've reached your limit.".to_string(),
            LimitStatus::Over { over } => {
                format!("You're {} over your weekly limit.", format_rounded(*over))
            }
        }
    }
}

// ── WeeklySummary ─────────────────────────────────────────────────────────────

/// Everything the main screen shows about the current week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    /// First calendar day of the current week.
    pub week_start: NaiveDate,
    /// Unrounded sum of the week's entries.
    pub total: f64,
    pub limit: f64,
    pub remaining: f64,
    pub over_limit: f64,
    pub status: LimitStatus,
}

impl WeeklySummary {
    /// Summarise an already-computed weekly total.
    pub fn from_total(week_start: NaiveDate, total: f64, limit: f64) -> Self {
        Self {
            week_start,
            total,
            limit,
            remaining: remaining(total, limit),
            over_limit: over_limit(total, limit),
            status: LimitStatus::evaluate(total, limit),
        }
    }

    /// Sum the entries of the week containing `now` and summarise them.
    ///
    /// Entries count when `week_start <= timestamp <= now`.
    pub fn compute(
        entries: &[DrinkEntry],
        settings: &WeekSettings,
        calendar: &Calendar,
        now: DateTime<Utc>,
    ) -> Self {
        let week_start = calendar.week_start_date(now, settings.week_start_day);
        let total = current_week_total(entries, settings, calendar, now);
        Self::from_total(week_start, total, settings.drink_limit)
    }

    pub fn rounded_total(&self) -> f64 {
        rounded_value(self.total)
    }

    /// e.g. `"Drinks this week."` / `"Drink this week."`.
    pub fn headline(&self) -> &'static str {
        if self.rounded_total() == 1.0 {
            "Drink this week."
        } else {
            "Drinks this week."
        }
    }

    pub fn progress(&self) -> f64 {
        progress(self.total, self.limit)
    }

    pub fn is_limit_hit(&self) -> bool {
        is_limit_hit(self.total, self.limit)
    }
}

/// Sum of entries logged between the start of the current week and `now`.
pub fn current_week_total(
    entries: &[DrinkEntry],
    settings: &WeekSettings,
    calendar: &Calendar,
    now: DateTime<Utc>,
) -> f64 {
    let start = calendar.week_start_instant(now, settings.week_start_day);
    entries
        .iter()
        .filter(|e| e.timestamp >= start && e.timestamp <= now)
        .map(|e| e.quantity)
        .sum()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
