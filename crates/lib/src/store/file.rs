//! JSON-file store: the whole state is rewritten after every mutation.

use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::{SessionStore, StoreState};

pub struct FileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl FileStore {
    /// Load store from path; if file missing or invalid, starts empty.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                log::warn!(
                    "session store {} is not valid, starting empty: {}",
                    path.display(),
                    e
                );
                StoreState::default()
            }),
            Err(_) => StoreState::default(),
        };
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self, state: &StoreState) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("writing session store {}", self.path.display()))
    }

    /// Apply `change` to a copy of the state; `change` reports whether anything changed.
    /// The copy replaces the in-memory state only once it has been written.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StoreState) -> (T, bool),
    ) -> anyhow::Result<T> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let (out, changed) = change(&mut next);
        if changed {
            self.save(&next).await?;
            *state = next;
        }
        Ok(out)
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn offset(&self) -> anyhow::Result<Option<i64>> {
        Ok(self.state.read().await.offset)
    }

    async fn set_offset(&self, offset: i64) -> anyhow::Result<()> {
        self.mutate(|state| ((), state.advance_offset(offset))).await
    }

    async fn status(&self, chat_id: i64) -> anyhow::Result<Option<String>> {
        Ok(self.state.read().await.statuses.get(&chat_id).cloned())
    }

    async fn set_status(&self, chat_id: i64, status: &str) -> anyhow::Result<()> {
        self.mutate(|state| {
            let previous = state.statuses.insert(chat_id, status.to_string());
            ((), previous.as_deref() != Some(status))
        })
        .await
    }

    async fn clear_status(&self, chat_id: i64) -> anyhow::Result<()> {
        self.mutate(|state| ((), state.statuses.remove(&chat_id).is_some()))
            .await
    }

    async fn add_user(&self, chat_id: i64) -> anyhow::Result<bool> {
        self.mutate(|state| {
            let added = state.users.insert(chat_id);
            (added, added)
        })
        .await
    }

    async fn remove_user(&self, chat_id: i64) -> anyhow::Result<()> {
        self.mutate(|state| ((), state.users.remove(&chat_id))).await
    }

    async fn users(&self) -> anyhow::Result<Vec<i64>> {
        Ok(self.state.read().await.users.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("botframework-store-{}", uuid::Uuid::new_v4()))
            .join("state.json")
    }

    #[tokio::test]
    async fn state_survives_reload() {
        let path = temp_path();
        {
            let store = FileStore::load(&path).await;
            store.set_offset(120).await.unwrap();
            store.set_status(9, "awaiting_text").await.unwrap();
            store.add_user(9).await.unwrap();
        }
        let store = FileStore::load(&path).await;
        assert_eq!(store.offset().await.unwrap(), Some(120));
        assert_eq!(store.status(9).await.unwrap().as_deref(), Some("awaiting_text"));
        assert_eq!(store.users().await.unwrap(), vec![9]);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn invalid_file_starts_empty() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();
        let store = FileStore::load(&path).await;
        assert_eq!(store.offset().await.unwrap(), None);
        assert!(store.users().await.unwrap().is_empty());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn failed_write_leaves_state_unchanged() {
        let dir = std::env::temp_dir()
            .join(format!("botframework-store-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let store = FileStore::load(blocker.join("state.json")).await;

        assert!(store.set_status(9, "awaiting_text").await.is_err());
        assert!(store.add_user(9).await.is_err());
        assert!(store.set_offset(10).await.is_err());
        assert_eq!(store.status(9).await.unwrap(), None);
        assert!(store.users().await.unwrap().is_empty());
        assert_eq!(store.offset().await.unwrap(), None);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
