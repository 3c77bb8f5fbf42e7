//! Key-value persistence.
//!
//! The polling core talks to an abstract `KeyValueStore`; values are whole
//! JSON documents read and written in one go. `StateStore` layers the typed
//! keys gitping knows about on top of any store implementation.
//!
//! Adapters:
//! - `MemoryStore` (here) for tests and `--memory` runs
//! - `db::kv_store::SqliteStore` for the on-disk store

use crate::error::AppError;
use crate::models::{Category, Settings, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Whole-value key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<(), AppError>;

    /// Write several values so that either all or none become visible.
    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), AppError>;

    /// Delete keys. Missing keys are ignored.
    async fn remove(&self, keys: &[&str]) -> Result<(), AppError>;

    /// Delete every key.
    async fn clear(&self) -> Result<(), AppError>;
}

/// Keys recognised by gitping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    Settings,
    LastUpdateTime,
    LastError,
    LastViewedTime,
    Snapshot(Category),
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::LastUpdateTime => "lastUpdateTime",
            Self::LastError => "lastError",
            Self::LastViewedTime => "lastViewedTime",
            Self::Snapshot(category) => category.storage_key(),
        }
    }

    /// Every key, used by `reset`.
    pub fn all() -> Vec<StorageKey> {
        let mut keys = vec![
            Self::Settings,
            Self::LastUpdateTime,
            Self::LastError,
            Self::LastViewedTime,
        ];
        keys.extend(Category::ALL.iter().map(|c| Self::Snapshot(*c)));
        keys
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AppError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), AppError> {
        // One write guard: readers see either the old or the new set.
        let mut values = self.values.write().await;
        values.extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), AppError> {
        let mut values = self.values.write().await;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.values.write().await.clear();
        Ok(())
    }
}

/// Typed access to gitping's persisted state.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<dyn KeyValueStore>,
}

impl StateStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// Store backed by a fresh `MemoryStore`.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    async fn get_typed<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>, AppError> {
        match self.inner.get(key.as_str()).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                AppError::data_shape(format!("Stored value is corrupt: {}", e), key.as_str())
            }),
        }
    }

    async fn set_typed<T: Serialize>(&self, key: StorageKey, value: &T) -> Result<(), AppError> {
        self.inner.set(key.as_str(), serde_json::to_value(value)?).await
    }

    pub async fn load_settings(&self) -> Result<Option<Settings>, AppError> {
        self.get_typed(StorageKey::Settings).await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), AppError> {
        self.set_typed(StorageKey::Settings, settings).await
    }

    /// Load the current snapshot. Missing or unreadable categories are empty.
    pub async fn load_snapshot(&self) -> Result<Snapshot, AppError> {
        let mut snapshot = Snapshot::default();
        for category in Category::ALL {
            let key = StorageKey::Snapshot(category);
            match category {
                Category::Mentions => {
                    snapshot.mentions = self.get_or_empty(key).await?;
                }
                Category::Personal => snapshot.personal = self.get_or_empty(key).await?,
                Category::Team => snapshot.team = self.get_or_empty(key).await?,
                Category::Mine => snapshot.mine = self.get_or_empty(key).await?,
            }
        }
        Ok(snapshot)
    }

    async fn get_or_empty<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Vec<T>, AppError> {
        match self.get_typed::<Vec<T>>(key).await {
            Ok(items) => Ok(items.unwrap_or_default()),
            // Only undecodable values degrade; store failures propagate.
            Err(AppError::DataShape { message, .. }) => {
                log::warn!("Discarding stored {}: {}", key.as_str(), message);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the whole snapshot in one write.
    pub async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        self.inner.set_many(snapshot_entries(snapshot)?).await
    }

    /// Persist the result of a successful cycle in one write: the snapshot
    /// (when it changed), the update time and a cleared last error.
    pub async fn commit_cycle(
        &self,
        snapshot: Option<&Snapshot>,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut entries = match snapshot {
            Some(snapshot) => snapshot_entries(snapshot)?,
            None => Vec::new(),
        };
        entries.push((
            StorageKey::LastUpdateTime.as_str().to_string(),
            serde_json::to_value(at)?,
        ));
        entries.push((StorageKey::LastError.as_str().to_string(), Value::from("")));
        self.inner.set_many(entries).await
    }

    /// Last error message, `None` when the last cycle succeeded.
    pub async fn last_error(&self) -> Result<Option<String>, AppError> {
        let message: Option<String> = self.get_typed(StorageKey::LastError).await?;
        Ok(message.filter(|m| !m.is_empty()))
    }

    pub async fn record_error(&self, message: &str) -> Result<(), AppError> {
        self.set_typed(StorageKey::LastError, &message).await
    }

    pub async fn clear_error(&self) -> Result<(), AppError> {
        self.set_typed(StorageKey::LastError, &"").await
    }

    pub async fn last_update_time(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        self.get_typed(StorageKey::LastUpdateTime).await
    }

    pub async fn last_viewed(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        self.get_typed(StorageKey::LastViewedTime).await
    }

    pub async fn mark_viewed(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.set_typed(StorageKey::LastViewedTime, &at).await
    }

    /// Forget credentials, snapshots and status.
    pub async fn reset(&self) -> Result<(), AppError> {
        let keys = StorageKey::all();
        let names: Vec<&str> = keys.iter().map(StorageKey::as_str).collect();
        self.inner.remove(&names).await
    }
}

fn snapshot_entries(snapshot: &Snapshot) -> Result<Vec<(String, Value)>, AppError> {
    let key = |category: Category| StorageKey::Snapshot(category).as_str().to_string();
    Ok(vec![
        (key(Category::Personal), serde_json::to_value(&snapshot.personal)?),
        (key(Category::Team), serde_json::to_value(&snapshot.team)?),
        (key(Category::Mine), serde_json::to_value(&snapshot.mine)?),
        (key(Category::Mentions), serde_json::to_value(&snapshot.mentions)?),
    ])
}
