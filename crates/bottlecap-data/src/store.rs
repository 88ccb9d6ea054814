//! Health data store abstraction.
//!
//! The [`HealthStore`] trait is the only way Bottle Cap reads or writes drink
//! entries. The store is the system of record; everything else derives from
//! what it returns. [`MemoryHealthStore`] backs tests and can be told to fail
//! specific operations.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use bottlecap_core::error::{BottleCapError, Result};
use bottlecap_core::models::{AuthorizationStatus, DrinkEntry};
use bottlecap_core::time_utils::Calendar;

/// Operations offered by a health data store holding drink entries.
///
/// All methods are asynchronous; callers treat them as opaque requests that
/// resolve to a result at some later time.
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Current access status for drink data.
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask for access to drink data.
    async fn request_authorization(&self) -> Result<()>;

    /// Persist one entry and return it with its assigned id.
    async fn create(&self, quantity: f64, timestamp: DateTime<Utc>) -> Result<DrinkEntry>;

    /// Entries with `start <= timestamp < end`.
    async fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<Vec<DrinkEntry>>;

    /// Every entry, newest first.
    async fn query_all(&self) -> Result<Vec<DrinkEntry>>;

    /// Remove a single entry.
    async fn delete(&self, entry: &DrinkEntry) -> Result<()>;

    /// Remove every entry with `start <= timestamp < end`.
    ///
    /// Fails with [`BottleCapError::Delete`] when the range holds no entries.
    async fn delete_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()>;
}

/// Fail unless access has been granted.
pub fn check_access(status: AuthorizationStatus) -> Result<()> {
    match status {
        AuthorizationStatus::Authorized => Ok(()),
        AuthorizationStatus::NotDetermined => Err(BottleCapError::AuthorizationIndeterminate),
        AuthorizationStatus::Denied => Err(BottleCapError::AuthorizationDenied),
    }
}

/// Sort entries newest first, the order `query_all` promises.
pub fn sort_newest_first(entries: &mut [DrinkEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

// ── MemoryHealthStore ─────────────────────────────────────────────────────────

/// In-memory store with failure injection.
///
/// Day-scoped failures are evaluated with the store's [`Calendar`], so a test
/// can make "deleting Tuesday" fail while the rest of the week succeeds.
pub struct MemoryHealthStore {
    entries: RwLock<Vec<DrinkEntry>>,
    authorization: Mutex<AuthorizationStatus>,
    grant_on_request: AtomicBool,
    fail_writes: AtomicBool,
    fail_queries: AtomicBool,
    failing_delete_days: Mutex<HashSet<NaiveDate>>,
    calendar: Calendar,
}

impl Default for MemoryHealthStore {
    fn default() -> Self {
        Self::new(Calendar::default())
    }
}

impl MemoryHealthStore {
    /// Empty, already-authorized store.
    pub fn new(calendar: Calendar) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            authorization: Mutex::new(AuthorizationStatus::Authorized),
            grant_on_request: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            failing_delete_days: Mutex::new(HashSet::new()),
            calendar,
        }
    }

    /// Store pre-filled with `entries`.
    pub fn with_entries(calendar: Calendar, entries: Vec<DrinkEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            ..Self::new(calendar)
        }
    }

    pub fn set_authorization(&self, status: AuthorizationStatus) {
        if let Ok(mut current) = self.authorization.lock() {
            *current = status;
        }
    }

    /// Whether a later `request_authorization` grants or denies access.
    pub fn set_grant_on_request(&self, grant: bool) {
        self.grant_on_request.store(grant, Ordering::Relaxed);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::Relaxed);
    }

    /// Make any delete that starts on `day` fail.
    pub fn fail_deletes_on(&self, day: NaiveDate) {
        if let Ok(mut days) = self.failing_delete_days.lock() {
            days.insert(day);
        }
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn status(&self) -> AuthorizationStatus {
        self.authorization
            .lock()
            .map(|s| *s)
            .unwrap_or(AuthorizationStatus::Denied)
    }

    fn delete_fails_on(&self, instant: DateTime<Utc>) -> bool {
        let day = self.calendar.day_of(instant);
        self.failing_delete_days
            .lock()
            .map(|days| days.contains(&day))
            .unwrap_or(false)
    }
}

#[async_trait]
impl HealthStore for MemoryHealthStore {
    async fn authorization_status(&self) -> AuthorizationStatus {
        self.status()
    }

    async fn request_authorization(&self) -> Result<()> {
        let granted = self.grant_on_request.load(Ordering::Relaxed);
        let status = if granted {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        self.set_authorization(status);
        if granted {
            Ok(())
        } else {
            Err(BottleCapError::AuthorizationDenied)
        }
    }

    async fn create(&self, quantity: f64, timestamp: DateTime<Utc>) -> Result<DrinkEntry> {
        check_access(self.status())?;
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(BottleCapError::Write("store unavailable".to_string()));
        }
        let entry = DrinkEntry::new(quantity, timestamp);
        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DrinkEntry>> {
        check_access(self.status())?;
        if self.fail_queries.load(Ordering::Relaxed) {
            return Err(BottleCapError::Query("store unavailable".to_string()));
        }
        let entries = self.entries.read().await;
        let mut found: Vec<DrinkEntry> = entries
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp < end)
            .cloned()
            .collect();
        sort_newest_first(&mut found);
        Ok(found)
    }

    async fn query_all(&self) -> Result<Vec<DrinkEntry>> {
        check_access(self.status())?;
        if self.fail_queries.load(Ordering::Relaxed) {
            return Err(BottleCapError::Query("store unavailable".to_string()));
        }
        let mut all = self.entries.read().await.clone();
        sort_newest_first(&mut all);
        Ok(all)
    }

    async fn delete(&self, entry: &DrinkEntry) -> Result<()> {
        check_access(self.status())?;
        if self.delete_fails_on(entry.timestamp) {
            return Err(BottleCapError::Delete("store unavailable".to_string()));
        }
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.id != entry.id);
        if entries.len() == before {
            return Err(BottleCapError::Delete(format!("no entry with id {}", entry.id)));
        }
        Ok(())
    }

    async fn delete_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
        check_access(self.status())?;
        if self.delete_fails_on(start) {
            return Err(BottleCapError::Delete("store unavailable".to_string()));
        }
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.timestamp < start || e.timestamp >= end);
        if entries.len() == before {
            return Err(BottleCapError::Delete("no entries in range".to_string()));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
