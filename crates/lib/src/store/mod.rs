//! Session store: resume cursor, per-chat status value, and known users.
//!
//! Only one consumer is expected to poll at a time; the stores lock internally
//! but do not coordinate across processes.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Offset to pass to the next getUpdates call (last processed update_id + 1).
    async fn offset(&self) -> anyhow::Result<Option<i64>>;
    async fn set_offset(&self, offset: i64) -> anyhow::Result<()>;

    async fn status(&self, chat_id: i64) -> anyhow::Result<Option<String>>;
    async fn set_status(&self, chat_id: i64, status: &str) -> anyhow::Result<()>;
    async fn clear_status(&self, chat_id: i64) -> anyhow::Result<()>;

    /// Returns true when the user was not known before.
    async fn add_user(&self, chat_id: i64) -> anyhow::Result<bool>;
    async fn remove_user(&self, chat_id: i64) -> anyhow::Result<()>;
    async fn users(&self) -> anyhow::Result<Vec<i64>>;
}

/// Everything a store keeps; also the on-disk format of [`FileStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub statuses: BTreeMap<i64, String>,
    #[serde(default)]
    pub users: BTreeSet<i64>,
}

impl StoreState {
    /// The cursor never moves backwards.
    fn advance_offset(&mut self, offset: i64) -> bool {
        if self.offset.map_or(true, |current| offset > current) {
            self.offset = Some(offset);
            true
        } else {
            false
        }
    }
}

/// Build the store selected by config. `config_path` anchors a relative file path.
pub async fn open_store(
    storage: &StorageConfig,
    config_path: &Path,
) -> anyhow::Result<Arc<dyn SessionStore>> {
    match storage.backend {
        StorageBackend::Memory => {
            log::debug!("using in-memory session store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::File => {
            let path = crate::config::resolve_storage_path(storage, config_path);
            log::info!("using file session store at {}", path.display());
            Ok(Arc::new(FileStore::load(path).await))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_only_moves_forward() {
        let mut state = StoreState::default();
        assert!(state.advance_offset(10));
        assert!(!state.advance_offset(4));
        assert!(!state.advance_offset(10));
        assert_eq!(state.offset, Some(10));
    }

    #[test]
    fn state_round_trips_with_integer_keys() {
        let mut state = StoreState::default();
        state.statuses.insert(-100123, "awaiting_name".to_string());
        state.users.insert(7);
        let json = serde_json::to_string(&state).expect("serialize");
        let back: StoreState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, state);
    }
}
