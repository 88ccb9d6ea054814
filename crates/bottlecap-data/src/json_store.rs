//! File-backed [`HealthStore`] used by the command line.
//!
//! The whole store is one JSON document holding the access grant and every
//! entry. Each mutation writes a temp file and renames it over the original,
//! and the in-memory copy is only replaced once the write succeeded.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use bottlecap_core::error::{BottleCapError, Result};
use bottlecap_core::models::{AuthorizationStatus, DrinkEntry};

use crate::store::{check_access, sort_newest_first, HealthStore};

/// File name of the drink store inside the data directory.
pub const STORE_FILE_NAME: &str = "drinks.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    authorization: AuthorizationStatus,
    #[serde(default)]
    entries: Vec<DrinkEntry>,
}

/// Drink entries persisted as a JSON document on disk.
pub struct JsonHealthStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl JsonHealthStore {
    /// Store path rooted at `data_dir`.
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(STORE_FILE_NAME)
    }

    /// Open the store at `path`. A missing file is an empty store whose
    /// access has not been requested yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<StoreDocument>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreDocument::default(),
            Err(source) => return Err(BottleCapError::FileAccess { path, source }),
        };
        tracing::debug!(
            path = %path.display(),
            entries = doc.entries.len(),
            "opened drink store"
        );
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Grant or revoke access directly, the way a user would in the system
    /// privacy settings. Unlike [`HealthStore::request_authorization`] this
    /// also lifts a denial.
    pub async fn set_authorization(&self, status: AuthorizationStatus) -> Result<()> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        next.authorization = status;
        self.persist(&next)
            .await
            .map_err(|e| BottleCapError::FileAccess {
                path: self.path.clone(),
                source: e,
            })?;
        *doc = next;
        Ok(())
    }

    async fn persist(&self, doc: &StoreDocument) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(std::io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }
}

#[async_trait]
impl HealthStore for JsonHealthStore {
    async fn authorization_status(&self) -> AuthorizationStatus {
        self.doc.lock().await.authorization
    }

    async fn request_authorization(&self) -> Result<()> {
        let mut doc = self.doc.lock().await;
        match doc.authorization {
            AuthorizationStatus::Authorized => Ok(()),
            // A denial is only lifted outside the app.
            AuthorizationStatus::Denied => Err(BottleCapError::AuthorizationDenied),
            AuthorizationStatus::NotDetermined => {
                let mut next = doc.clone();
                next.authorization = AuthorizationStatus::Authorized;
                self.persist(&next)
                    .await
                    .map_err(|e| BottleCapError::FileAccess {
                        path: self.path.clone(),
                        source: e,
                    })?;
                *doc = next;
                tracing::info!("drink store access granted");
                Ok(())
            }
        }
    }

    async fn create(&self, quantity: f64, timestamp: DateTime<Utc>) -> Result<DrinkEntry> {
        let mut doc = self.doc.lock().await;
        check_access(doc.authorization)?;

        let entry = DrinkEntry::new(quantity, timestamp);
        let mut next = doc.clone();
        next.entries.push(entry.clone());
        self.persist(&next)
            .await
            .map_err(|e| BottleCapError::Write(e.to_string()))?;
        *doc = next;
        Ok(entry)
    }

    async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DrinkEntry>> {
        let doc = self.doc.lock().await;
        check_access(doc.authorization)?;
        let mut found: Vec<DrinkEntry> = doc
            .entries
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp < end)
            .cloned()
            .collect();
        sort_newest_first(&mut found);
        Ok(found)
    }

    async fn query_all(&self) -> Result<Vec<DrinkEntry>> {
        let doc = self.doc.lock().await;
        check_access(doc.authorization)?;
        let mut all = doc.entries.clone();
        sort_newest_first(&mut all);
        Ok(all)
    }

    async fn delete(&self, entry: &DrinkEntry) -> Result<()> {
        let mut doc = self.doc.lock().await;
        check_access(doc.authorization)?;

        let mut next = doc.clone();
        next.entries.retain(|e| e.id != entry.id);
        if next.entries.len() == doc.entries.len() {
            return Err(BottleCapError::Delete(format!("no entry with id {}", entry.id)));
        }
        self.persist(&next)
            .await
            .map_err(|e| BottleCapError::Delete(e.to_string()))?;
        *doc = next;
        Ok(())
    }

    async fn delete_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
        let mut doc = self.doc.lock().await;
        check_access(doc.authorization)?;

        let mut next = doc.clone();
        next.entries
            .retain(|e| e.timestamp < start || e.timestamp >= end);
        if next.entries.len() == doc.entries.len() {
            return Err(BottleCapError::Delete("no entries in range".to_string()));
        }
        self.persist(&next)
            .await
            .map_err(|e| BottleCapError::Delete(e.to_string()))?;
        *doc = next;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
