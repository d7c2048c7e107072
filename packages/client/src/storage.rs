//! Local key-value preferences.
//!
//! Persists the selected group and the per-user display order of the status
//! and mood lists as one JSON object in a file. Writes go through a temporary
//! file and a rename so a crash never leaves a truncated file behind.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::{GroupId, UserId};

const SELECTED_GROUP_KEY: &str = "selectedGroupId";
const STATUS_ORDER_PREFIX: &str = "statusOrder:";
const MOOD_ORDER_PREFIX: &str = "moodOrder:";

/// Preferences storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access preferences file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preferences file '{path}' is corrupted: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode preferences: {0}")]
    Encode(#[source] serde_json::Error),
}

type Entries = BTreeMap<String, serde_json::Value>;

/// Key-value preferences, optionally backed by a file
pub struct Preferences {
    path: Option<PathBuf>,
    entries: Mutex<Entries>,
}

impl Preferences {
    /// Preferences that live only as long as the process
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Entries::new()),
        }
    }

    /// Load preferences from `path`. A missing file means empty preferences.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Entries::new(),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupted {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        tracing::debug!(
            "Loaded {} preference entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ----------------------------------------
    // Selected group
    // ----------------------------------------

    pub async fn selected_group(&self) -> Option<GroupId> {
        let entries = self.entries.lock().await;
        entries
            .get(SELECTED_GROUP_KEY)
            .and_then(|value| value.as_str())
            .and_then(|value| GroupId::new(value).ok())
    }

    pub async fn set_selected_group(&self, group_id: Option<&GroupId>) -> Result<(), StorageError> {
        let value = group_id.map(|group_id| serde_json::Value::from(group_id.as_str()));
        self.put(SELECTED_GROUP_KEY.to_string(), value).await
    }

    // ----------------------------------------
    // Display order
    // ----------------------------------------

    /// User ids in the order `user_id` arranged the status list
    pub async fn status_order(&self, user_id: &UserId) -> Vec<UserId> {
        self.order(&order_key(STATUS_ORDER_PREFIX, user_id)).await
    }

    pub async fn set_status_order(
        &self,
        user_id: &UserId,
        order: &[UserId],
    ) -> Result<(), StorageError> {
        self.set_order(order_key(STATUS_ORDER_PREFIX, user_id), order).await
    }

    /// User ids in the order `user_id` arranged the mood list
    pub async fn mood_order(&self, user_id: &UserId) -> Vec<UserId> {
        self.order(&order_key(MOOD_ORDER_PREFIX, user_id)).await
    }

    pub async fn set_mood_order(
        &self,
        user_id: &UserId,
        order: &[UserId],
    ) -> Result<(), StorageError> {
        self.set_order(order_key(MOOD_ORDER_PREFIX, user_id), order).await
    }

    async fn order(&self, key: &str) -> Vec<UserId> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .and_then(|value| value.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .filter_map(|item| UserId::new(item).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn set_order(&self, key: String, order: &[UserId]) -> Result<(), StorageError> {
        let value = order
            .iter()
            .map(|user_id| serde_json::Value::from(user_id.as_str()))
            .collect::<Vec<_>>();
        self.put(key, Some(serde_json::Value::Array(value))).await
    }

    /// Drop all entries (sign-out)
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        entries.clear();
        self.persist(&entries).await
    }

    async fn put(&self, key: String, value: Option<serde_json::Value>) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        match value {
            Some(value) => entries.insert(key, value),
            None => entries.remove(&key),
        };
        self.persist(&entries).await
    }

    /// Callers hold the entries lock, which serializes writes
    async fn persist(&self, entries: &Entries) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(entries).map_err(StorageError::Encode)?;
        let tmp = path.with_extension("tmp");
        let io_error = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        tokio::fs::write(&tmp, bytes).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_error)?;
        Ok(())
    }
}

fn order_key(prefix: &str, user_id: &UserId) -> String {
    format!("{}{}", prefix, user_id)
}

/// Sort `items` by a saved order of user ids.
///
/// Items whose user is in `order` come first in that order; the rest keep
/// their relative order at the end.
pub fn apply_order<T>(items: &mut [T], order: &[UserId], user_of: impl Fn(&T) -> &UserId) {
    items.sort_by_key(|item| {
        let user_id = user_of(item);
        order
            .iter()
            .position(|ordered| ordered == user_id)
            .unwrap_or(order.len())
    });
}
