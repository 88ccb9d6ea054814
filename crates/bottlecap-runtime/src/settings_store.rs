//! Long-lived week settings with change notification.
//!
//! The store owns the current [`WeekSettings`] inside a `watch` channel.
//! Every accepted change is written to `settings.json` (when file-backed) and
//! then published, so subscribers such as the refresh orchestrator rebuild
//! their views with the new week start or limit.

use std::path::{Path, PathBuf};

use tokio::sync::watch;

use bottlecap_core::error::{BottleCapError, Result};
use bottlecap_core::models::{WeekSettings, WeekStartDay};
use bottlecap_core::settings::SettingsFile;

pub struct SettingsStore {
    path: Option<PathBuf>,
    tx: watch::Sender<WeekSettings>,
}

impl SettingsStore {
    /// Load settings from `path`, falling back to defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = SettingsFile::load_from(&path);
        tracing::debug!(
            path = %path.display(),
            week_start = %settings.week_start_day,
            limit = settings.drink_limit,
            "settings loaded"
        );
        Self {
            path: Some(path),
            tx: watch::Sender::new(settings),
        }
    }

    /// Settings that live only for this process.
    pub fn in_memory(settings: WeekSettings) -> Self {
        Self {
            path: None,
            tx: watch::Sender::new(settings),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> WeekSettings {
        *self.tx.borrow()
    }

    /// Validate, persist and publish `settings`.
    ///
    /// Subscribers are only notified when the value actually changes.
    pub fn set(&self, settings: WeekSettings) -> Result<()> {
        settings.validate()?;
        if let Some(path) = &self.path {
            SettingsFile::save_to(&settings, path).map_err(|source| {
                BottleCapError::FileAccess {
                    path: path.clone(),
                    source,
                }
            })?;
        }
        let changed = self.tx.send_if_modified(|current| {
            if *current == settings {
                false
            } else {
                *current = settings;
                true
            }
        });
        if changed {
            tracing::info!(
                week_start = %settings.week_start_day,
                limit = settings.drink_limit,
                "settings changed"
            );
        }
        Ok(())
    }

    pub fn set_week_start_day(&self, day: WeekStartDay) -> Result<()> {
        self.set(WeekSettings {
            week_start_day: day,
            ..self.get()
        })
    }

    pub fn set_drink_limit(&self, limit: f64) -> Result<()> {
        self.set(WeekSettings {
            drink_limit: limit,
            ..self.get()
        })
    }

    /// Receiver that observes every published change.
    pub fn subscribe(&self) -> watch::Receiver<WeekSettings> {
        self.tx.subscribe()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::open(SettingsFile::path_in(dir.path()));
        assert_eq!(store.get(), WeekSettings::default());
    }

    #[test]
    fn test_set_persists() {
        let dir = TempDir::new().unwrap();
        let path = SettingsFile::path_in(dir.path());
        let store = SettingsStore::open(&path);

        store.set_week_start_day(WeekStartDay::Sunday).unwrap();
        store.set_drink_limit(10.0).unwrap();

        let reopened = SettingsStore::open(&path);
        assert_eq!(reopened.get().week_start_day, WeekStartDay::Sunday);
        assert_eq!(reopened.get().drink_limit, 10.0);
    }

    #[test]
    fn test_invalid_limit_rejected() {
        let store = SettingsStore::in_memory(WeekSettings::default());
        assert!(matches!(
            store.set_drink_limit(0.0),
            Err(BottleCapError::InvalidLimit(_))
        ));
        assert!(store.set_drink_limit(f64::NAN).is_err());
        assert_eq!(store.get(), WeekSettings::default());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = SettingsStore::in_memory(WeekSettings::default());
        let mut rx = store.subscribe();

        store.set_week_start_day(WeekStartDay::Friday).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().week_start_day, WeekStartDay::Friday);
    }

    #[tokio::test]
    async fn test_unchanged_value_is_not_published() {
        let store = SettingsStore::in_memory(WeekSettings::default());
        let rx = store.subscribe();

        store.set(WeekSettings::default()).unwrap();
        assert!(!rx.has_changed().unwrap());
    }
}
