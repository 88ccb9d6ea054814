//! Async refresh orchestrator.
//!
//! Runs [`DrinkTracker::refresh`] in a tokio task whenever the front end asks
//! for it (returning to the foreground, pulling to refresh) or the settings
//! change, and forwards each [`WeeklySummary`] through an `mpsc` channel so
//! the front end never shares mutable state with the task.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use bottlecap_core::calculations::WeeklySummary;
use bottlecap_core::models::WeekSettings;

use crate::tracker::DrinkTracker;

/// Capacity of both the trigger and the summary channel.
const CHANNEL_CAPACITY: usize = 16;

// ── Public types ──────────────────────────────────────────────────────────────

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The app came back to the foreground.
    Foreground,
    /// The user asked explicitly.
    Manual,
    /// Week start or limit changed.
    SettingsChanged,
}

// ── RefreshOrchestrator ───────────────────────────────────────────────────────

/// Background refresh coordinator.
///
/// Triggers that pile up while a refresh is running are folded into the next
/// single refresh, since they would all read the same store state.
pub struct RefreshOrchestrator {
    tracker: Arc<DrinkTracker>,
    settings: watch::Receiver<WeekSettings>,
}

impl RefreshOrchestrator {
    pub fn new(tracker: Arc<DrinkTracker>, settings: watch::Receiver<WeekSettings>) -> Self {
        Self { tracker, settings }
    }

    /// Spawn the refresh loop.
    ///
    /// Returns the summary receiver and a [`RefreshHandle`] for sending
    /// triggers and stopping the loop. One refresh runs immediately.
    pub fn start(self) -> (mpsc::Receiver<WeeklySummary>, RefreshHandle) {
        let (summary_tx, summary_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (trigger_tx, trigger_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let handle = tokio::spawn(async move {
            self.refresh_loop(trigger_rx, summary_tx).await;
        });

        (
            summary_rx,
            RefreshHandle {
                triggers: trigger_tx,
                handle,
            },
        )
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Exits when the summary receiver or every trigger sender is dropped.
    async fn refresh_loop(
        mut self,
        mut triggers: mpsc::Receiver<RefreshTrigger>,
        tx: mpsc::Sender<WeeklySummary>,
    ) {
        self.refresh_and_send(RefreshTrigger::Foreground, &tx).await;

        let mut settings_open = true;
        loop {
            let trigger = tokio::select! {
                received = triggers.recv() => match received {
                    Some(trigger) => trigger,
                    None => {
                        tracing::debug!("trigger channel closed; exiting refresh loop");
                        break;
                    }
                },
                changed = self.settings.changed(), if settings_open => match changed {
                    Ok(()) => RefreshTrigger::SettingsChanged,
                    Err(_) => {
                        settings_open = false;
                        continue;
                    }
                },
            };

            let folded = drain_pending(&mut triggers);
            if folded > 0 {
                tracing::debug!(folded, "coalesced queued refresh triggers");
            }

            if tx.is_closed() {
                tracing::debug!("summary channel closed; exiting refresh loop");
                break;
            }
            self.refresh_and_send(trigger, &tx).await;
        }
    }

    async fn refresh_and_send(
        &mut self,
        trigger: RefreshTrigger,
        tx: &mpsc::Sender<WeeklySummary>,
    ) {
        // Marks the current settings as seen, folding a pending change into
        // this refresh.
        let settings = *self.settings.borrow_and_update();
        tracing::debug!(?trigger, "refreshing weekly total");

        let summary = match self.tracker.refresh(&settings).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(?trigger, error = %e, "refresh failed; skipping send");
                return;
            }
        };

        if let Err(e) = tx.send(summary).await {
            tracing::warn!(error = %e, "failed to send weekly summary; receiver dropped");
        }
    }
}

// ── RefreshHandle ─────────────────────────────────────────────────────────────

/// Handle to the background refresh task.
pub struct RefreshHandle {
    triggers: mpsc::Sender<RefreshTrigger>,
    handle: tokio::task::JoinHandle<()>,
}

impl RefreshHandle {
    /// Queue a refresh. Returns `false` once the loop has stopped.
    pub async fn trigger(&self, trigger: RefreshTrigger) -> bool {
        self.triggers.send(trigger).await.is_ok()
    }

    /// Queue a refresh without waiting. A full queue already guarantees a
    /// pending refresh, so the trigger is dropped in that case.
    pub fn try_trigger(&self, trigger: RefreshTrigger) -> bool {
        match self.triggers.try_send(trigger) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Immediately abort the refresh loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Discard triggers already queued, returning how many were dropped.
fn drain_pending(triggers: &mut mpsc::Receiver<RefreshTrigger>) -> usize {
    let mut drained = 0;
    while triggers.try_recv().is_ok() {
        drained += 1;
    }
    drained
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bottlecap_core::calculations::LimitStatus;
    use bottlecap_core::models::{DrinkEntry, WeekStartDay};
    use bottlecap_core::time_utils::{Calendar, FixedClock};
    use bottlecap_data::store::{HealthStore, MemoryHealthStore};
    use chrono::{TimeZone, Utc};

    use crate::settings_store::SettingsStore;

    const WAIT: Duration = Duration::from_secs(5);

    // Wednesday 2024-10-09 18:00 UTC, with 4 drinks on Monday and 1 on Sunday.
    fn fixture() -> (Arc<MemoryHealthStore>, Arc<DrinkTracker>) {
        let store = Arc::new(MemoryHealthStore::with_entries(
            Calendar::default(),
            vec![
                DrinkEntry::new(4.0, Utc.with_ymd_and_hms(2024, 10, 7, 20, 0, 0).unwrap()),
                DrinkEntry::new(1.0, Utc.with_ymd_and_hms(2024, 10, 6, 20, 0, 0).unwrap()),
            ],
        ));
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 10, 9, 18, 0, 0).unwrap());
        let tracker = Arc::new(DrinkTracker::new(
            store.clone(),
            Calendar::default(),
            Arc::new(clock),
        ));
        (store, tracker)
    }

    async fn next(rx: &mut mpsc::Receiver<WeeklySummary>) -> WeeklySummary {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for summary")
            .expect("channel closed before receiving summary")
    }

    #[tokio::test]
    async fn test_sends_initial_summary() {
        let (_store, tracker) = fixture();
        let settings = SettingsStore::in_memory(WeekSettings::default());
        let (mut rx, handle) = RefreshOrchestrator::new(tracker, settings.subscribe()).start();

        let summary = next(&mut rx).await;
        assert_eq!(summary.total, 4.0);
        assert_eq!(summary.status, LimitStatus::Under { remaining: 2.0 });

        handle.abort();
    }

    #[tokio::test]
    async fn test_manual_trigger_sees_new_entries() {
        let (store, tracker) = fixture();
        let settings = SettingsStore::in_memory(WeekSettings::default());
        let (mut rx, handle) = RefreshOrchestrator::new(tracker, settings.subscribe()).start();
        next(&mut rx).await;

        store
            .create(2.0, Utc.with_ymd_and_hms(2024, 10, 9, 12, 0, 0).unwrap())
            .await
            .unwrap();
        assert!(handle.trigger(RefreshTrigger::Manual).await);

        let summary = next(&mut rx).await;
        assert_eq!(summary.total, 6.0);
        assert_eq!(summary.status, LimitStatus::Reached);

        handle.abort();
    }

    #[tokio::test]
    async fn test_settings_change_refreshes() {
        let (_store, tracker) = fixture();
        let settings = SettingsStore::in_memory(WeekSettings::default());
        let (mut rx, handle) = RefreshOrchestrator::new(tracker, settings.subscribe()).start();
        next(&mut rx).await;

        // A Sunday start pulls Sunday's drink into the running week.
        settings.set_week_start_day(WeekStartDay::Sunday).unwrap();
        let summary = next(&mut rx).await;
        assert_eq!(summary.total, 5.0);
        assert_eq!(summary.limit, 6.0);

        settings.set_drink_limit(3.0).unwrap();
        let summary = next(&mut rx).await;
        assert_eq!(summary.status, LimitStatus::Over { over: 2.0 });

        handle.abort();
    }

    #[tokio::test]
    async fn test_queued_triggers_are_coalesced() {
        let (_store, tracker) = fixture();
        let settings = SettingsStore::in_memory(WeekSettings::default());
        let (mut rx, handle) = RefreshOrchestrator::new(tracker, settings.subscribe()).start();
        next(&mut rx).await;

        // The test runtime is single-threaded, so all three are queued before
        // the loop wakes up.
        assert!(handle.try_trigger(RefreshTrigger::Foreground));
        assert!(handle.try_trigger(RefreshTrigger::Manual));
        assert!(handle.try_trigger(RefreshTrigger::Manual));

        next(&mut rx).await;
        let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(extra.is_err(), "expected a single refresh for queued triggers");

        handle.abort();
    }

    #[tokio::test]
    async fn test_failed_refresh_is_skipped() {
        let (store, tracker) = fixture();
        let settings = SettingsStore::in_memory(WeekSettings::default());
        let (mut rx, handle) = RefreshOrchestrator::new(tracker, settings.subscribe()).start();
        next(&mut rx).await;

        store.set_fail_queries(true);
        assert!(handle.trigger(RefreshTrigger::Manual).await);
        let missing = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(missing.is_err());

        store.set_fail_queries(false);
        assert!(handle.trigger(RefreshTrigger::Manual).await);
        assert_eq!(next(&mut rx).await.total, 4.0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_start_and_abort() {
        let (_store, tracker) = fixture();
        let settings = SettingsStore::in_memory(WeekSettings::default());
        let (_rx, handle) = RefreshOrchestrator::new(tracker, settings.subscribe()).start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
    }
}
