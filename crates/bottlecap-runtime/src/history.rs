//! Drinking history with day and week deletion.
//!
//! [`HistoryManager`] keeps a per-day total map loaded from the health store
//! and re-buckets it on demand. Deletes go to the store first; the local map
//! only drops the days whose delete succeeded, so it never needs a re-fetch.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;

use bottlecap_core::error::{BottleCapError, Result};
use bottlecap_core::models::{DayTotal, WeekStartDay};
use bottlecap_core::time_utils::{week_days, Calendar};
use bottlecap_data::aggregator::{HistoryBucketer, HistoryBuckets};
use bottlecap_data::store::HealthStore;

// ── WeekDeletion ──────────────────────────────────────────────────────────────

/// Outcome of deleting every day of one week.
#[derive(Debug, Default)]
pub struct WeekDeletion {
    pub deleted: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, BottleCapError)>,
}

impl WeekDeletion {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// `Ok` with the deleted days, or `PartialBatchFailure` naming the days
    /// that could not be deleted.
    pub fn into_result(self) -> Result<Vec<NaiveDate>> {
        if self.failed.is_empty() {
            Ok(self.deleted)
        } else {
            Err(BottleCapError::PartialBatchFailure {
                failed: self.failed.into_iter().map(|(day, _)| day).collect(),
            })
        }
    }
}

// ── HistoryManager ────────────────────────────────────────────────────────────

pub struct HistoryManager {
    store: Arc<dyn HealthStore>,
    calendar: Calendar,
    daily: BTreeMap<NaiveDate, f64>,
}

impl HistoryManager {
    pub fn new(store: Arc<dyn HealthStore>, calendar: Calendar) -> Self {
        Self {
            store,
            calendar,
            daily: BTreeMap::new(),
        }
    }

    /// Replace the local map with every entry in the store.
    pub async fn load(&mut self) -> Result<()> {
        let entries = self
            .store
            .query_all()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "history query failed"))?;
        self.daily = HistoryBucketer::daily_totals(&entries, &self.calendar);
        tracing::debug!(
            entries = entries.len(),
            days = self.daily.len(),
            "history loaded"
        );
        Ok(())
    }

    pub fn daily_totals(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.daily
    }

    /// Current-week days and earlier weekly buckets as of `now`.
    pub fn buckets(&self, week_start: WeekStartDay, now: DateTime<Utc>) -> HistoryBuckets {
        let current = self.calendar.week_start_date(now, week_start);
        HistoryBucketer::bucket_daily_totals(&self.daily, week_start, current)
    }

    /// Days of the week starting on `week_start` that have drinks.
    pub fn week_detail(&self, week_start: NaiveDate) -> Vec<DayTotal> {
        HistoryBucketer::week_detail(&self.daily, week_start)
    }

    /// Delete every entry on `day`.
    pub async fn delete_day(&mut self, day: NaiveDate) -> Result<()> {
        delete_one_day(self.store.as_ref(), &self.calendar, day)
            .await
            .inspect_err(|e| tracing::warn!(day = %day, error = %e, "day delete failed"))?;
        self.daily.remove(&day);
        tracing::info!(day = %day, "deleted day");
        Ok(())
    }

    /// Delete each day with drinks in the week starting on `week_start`.
    ///
    /// The per-day deletes run concurrently. Successful days are removed
    /// locally even when others fail; nothing is rolled back.
    pub async fn delete_week(&mut self, week_start: NaiveDate) -> WeekDeletion {
        let days: Vec<NaiveDate> = week_days(week_start)
            .into_iter()
            .filter(|day| self.daily.contains_key(day))
            .collect();

        let store = self.store.as_ref();
        let calendar = &self.calendar;
        let results = join_all(days.iter().map(|&day| async move {
            (day, delete_one_day(store, calendar, day).await)
        }))
        .await;

        let mut report = WeekDeletion::default();
        for (day, result) in results {
            match result {
                Ok(()) => {
                    self.daily.remove(&day);
                    report.deleted.push(day);
                }
                Err(e) => {
                    tracing::warn!(day = %day, error = %e, "day delete failed");
                    report.failed.push((day, e));
                }
            }
        }
        tracing::info!(
            week_start = %week_start,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "week delete finished"
        );
        report
    }
}

async fn delete_one_day(
    store: &dyn HealthStore,
    calendar: &Calendar,
    day: NaiveDate,
) -> Result<()> {
    let (start, end) = calendar.day_range(day);
    store.delete_range(start, end).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
