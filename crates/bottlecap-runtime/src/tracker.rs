//! Current-week drink tracking.
//!
//! [`DrinkTracker`] sits between the front end and the health store. It runs
//! the access request flow, validates and writes new drink entries, and turns
//! the entries of the running week into a [`WeeklySummary`].

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use bottlecap_core::calculations::WeeklySummary;
use bottlecap_core::error::{BottleCapError, Result};
use bottlecap_core::models::{AuthorizationStatus, DrinkEntry, WeekSettings};
use bottlecap_core::time_utils::{Calendar, Clock};
use bottlecap_data::store::HealthStore;

/// Largest quantity accepted by a single log action.
pub const MAX_DRINKS_PER_LOG: f64 = 20.0;

/// Logs drinks and summarises the running week.
pub struct DrinkTracker {
    store: Arc<dyn HealthStore>,
    calendar: Calendar,
    clock: Arc<dyn Clock>,
}

impl DrinkTracker {
    pub fn new(store: Arc<dyn HealthStore>, calendar: Calendar, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            calendar,
            clock,
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Make sure the store grants access, asking for it when the user has not
    /// decided yet.
    pub async fn ensure_authorized(&self) -> Result<()> {
        match self.store.authorization_status().await {
            AuthorizationStatus::Authorized => Ok(()),
            AuthorizationStatus::Denied => Err(BottleCapError::AuthorizationDenied),
            AuthorizationStatus::NotDetermined => {
                tracing::info!("requesting drink store access");
                self.store.request_authorization().await?;
                match self.store.authorization_status().await {
                    AuthorizationStatus::Authorized => Ok(()),
                    AuthorizationStatus::Denied => Err(BottleCapError::AuthorizationDenied),
                    AuthorizationStatus::NotDetermined => {
                        Err(BottleCapError::AuthorizationIndeterminate)
                    }
                }
            }
        }
    }

    /// Check a log request before it reaches the store.
    pub fn validate_log(&self, quantity: f64, day: NaiveDate) -> Result<()> {
        if !quantity.is_finite() || quantity <= 0.0 || quantity > MAX_DRINKS_PER_LOG {
            return Err(BottleCapError::InvalidQuantity(quantity));
        }
        let today = self.calendar.day_of(self.now());
        if day > today {
            return Err(BottleCapError::FutureDate(day));
        }
        Ok(())
    }

    /// Record `quantity` drinks on `day` (today when `None`).
    ///
    /// The entry keeps the current local time of day, so a past day sorts the
    /// way it would have had it been logged then.
    pub async fn log_drinks(&self, quantity: f64, day: Option<NaiveDate>) -> Result<DrinkEntry> {
        let now = self.now();
        let day = day.unwrap_or_else(|| self.calendar.day_of(now));
        self.validate_log(quantity, day)?;

        let timestamp = self.timestamp_on(day, now);
        let entry = self
            .store
            .create(quantity, timestamp)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "failed to log drinks"))?;
        tracing::info!(quantity, day = %day, "logged drinks");
        Ok(entry)
    }

    /// Fetch the running week from the store and summarise it.
    pub async fn refresh(&self, settings: &WeekSettings) -> Result<WeeklySummary> {
        let now = self.now();
        let start = self
            .calendar
            .week_start_instant(now, settings.week_start_day);

        // The store range is half-open, so widen by the smallest step to
        // keep an entry stamped exactly `now`.
        let end = now + chrono::Duration::nanoseconds(1);
        let entries = self
            .store
            .query_range(start, end)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "weekly query failed"))?;

        let summary = WeeklySummary::compute(&entries, settings, &self.calendar, now);
        tracing::debug!(
            week_start = %summary.week_start,
            total = summary.total,
            entries = entries.len(),
            "weekly total refreshed"
        );
        Ok(summary)
    }

    fn timestamp_on(&self, day: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
        let tz = self.calendar.timezone();
        let time_of_day = now.with_timezone(&tz).time();
        tz.from_local_datetime(&day.and_time(time_of_day))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| self.calendar.start_of_day(day))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bottlecap_core::calculations::LimitStatus;
    use bottlecap_core::models::WeekStartDay;
    use bottlecap_core::time_utils::FixedClock;
    use bottlecap_data::store::MemoryHealthStore;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, d, h, 0, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    // Wednesday 2024-10-09, 18:00 UTC.
    fn tracker_with(store: Arc<MemoryHealthStore>) -> DrinkTracker {
        DrinkTracker::new(store, Calendar::default(), Arc::new(FixedClock(at(9, 18))))
    }

    fn settings(limit: f64) -> WeekSettings {
        WeekSettings::new(WeekStartDay::Monday, limit).unwrap()
    }

    #[tokio::test]
    async fn test_log_and_refresh() {
        let store = Arc::new(MemoryHealthStore::new(Calendar::default()));
        let tracker = tracker_with(store.clone());

        tracker.log_drinks(2.0, None).await.unwrap();
        tracker.log_drinks(1.5, Some(date(7))).await.unwrap();
        // Sunday belongs to the previous Monday week.
        tracker.log_drinks(4.0, Some(date(6))).await.unwrap();

        let summary = tracker.refresh(&settings(6.0)).await.unwrap();
        assert_eq!(summary.week_start, date(7));
        assert_eq!(summary.total, 3.5);
        assert_eq!(summary.remaining, 2.5);
        assert_eq!(summary.status, LimitStatus::Under { remaining: 2.5 });
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_entry_logged_now_counts() {
        let store = Arc::new(MemoryHealthStore::new(Calendar::default()));
        let tracker = tracker_with(store);

        let entry = tracker.log_drinks(1.0, None).await.unwrap();
        assert_eq!(entry.timestamp, at(9, 18));
        let summary = tracker.refresh(&settings(6.0)).await.unwrap();
        assert_eq!(summary.total, 1.0);
    }

    #[tokio::test]
    async fn test_past_day_keeps_time_of_day() {
        let store = Arc::new(MemoryHealthStore::new(Calendar::default()));
        let tracker = tracker_with(store);

        let entry = tracker.log_drinks(1.0, Some(date(3))).await.unwrap();
        assert_eq!(entry.timestamp, at(3, 18));
    }

    #[tokio::test]
    async fn test_rejects_bad_quantities() {
        let tracker = tracker_with(Arc::new(MemoryHealthStore::new(Calendar::default())));
        for q in [0.0, -1.0, 20.5, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    tracker.log_drinks(q, None).await,
                    Err(BottleCapError::InvalidQuantity(_))
                ),
                "accepted {q}"
            );
        }
        assert!(tracker.log_drinks(20.0, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_future_date() {
        let tracker = tracker_with(Arc::new(MemoryHealthStore::new(Calendar::default())));
        assert!(matches!(
            tracker.log_drinks(1.0, Some(date(10))).await,
            Err(BottleCapError::FutureDate(d)) if d == date(10)
        ));
    }

    #[tokio::test]
    async fn test_failed_write_is_surfaced() {
        let store = Arc::new(MemoryHealthStore::new(Calendar::default()));
        store.set_fail_writes(true);
        let tracker = tracker_with(store.clone());

        assert!(matches!(
            tracker.log_drinks(1.0, None).await,
            Err(BottleCapError::Write(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_query_is_surfaced() {
        let store = Arc::new(MemoryHealthStore::new(Calendar::default()));
        store.set_fail_queries(true);
        let tracker = tracker_with(store);
        assert!(matches!(
            tracker.refresh(&settings(6.0)).await,
            Err(BottleCapError::Query(_))
        ));
    }

    #[tokio::test]
    async fn test_authorization_request_flow() {
        let store = Arc::new(MemoryHealthStore::new(Calendar::default()));
        store.set_authorization(AuthorizationStatus::NotDetermined);
        let tracker = tracker_with(store.clone());

        tracker.ensure_authorized().await.unwrap();
        assert_eq!(
            store.authorization_status().await,
            AuthorizationStatus::Authorized
        );
    }

    #[tokio::test]
    async fn test_authorization_declined() {
        let store = Arc::new(MemoryHealthStore::new(Calendar::default()));
        store.set_authorization(AuthorizationStatus::NotDetermined);
        store.set_grant_on_request(false);
        let tracker = tracker_with(store);

        let err = tracker.ensure_authorized().await.unwrap_err();
        assert!(err.is_authorization());
    }

    #[tokio::test]
    async fn test_denied_is_not_requested_again() {
        let store = Arc::new(MemoryHealthStore::new(Calendar::default()));
        store.set_authorization(AuthorizationStatus::Denied);
        let tracker = tracker_with(store);
        assert!(matches!(
            tracker.ensure_authorized().await,
            Err(BottleCapError::AuthorizationDenied)
        ));
    }
}
