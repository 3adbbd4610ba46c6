use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SessionStore, StoreState};

/// In-memory store; state is lost when the process exits.
pub struct MemoryStore {
    inner: RwLock<StoreState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn offset(&self) -> anyhow::Result<Option<i64>> {
        Ok(self.inner.read().await.offset)
    }

    async fn set_offset(&self, offset: i64) -> anyhow::Result<()> {
        self.inner.write().await.advance_offset(offset);
        Ok(())
    }

    async fn status(&self, chat_id: i64) -> anyhow::Result<Option<String>> {
        Ok(self.inner.read().await.statuses.get(&chat_id).cloned())
    }

    async fn set_status(&self, chat_id: i64, status: &str) -> anyhow::Result<()> {
        self.inner
            .write()
            .await
            .statuses
            .insert(chat_id, status.to_string());
        Ok(())
    }

    async fn clear_status(&self, chat_id: i64) -> anyhow::Result<()> {
        self.inner.write().await.statuses.remove(&chat_id);
        Ok(())
    }

    async fn add_user(&self, chat_id: i64) -> anyhow::Result<bool> {
        Ok(self.inner.write().await.users.insert(chat_id))
    }

    async fn remove_user(&self, chat_id: i64) -> anyhow::Result<()> {
        self.inner.write().await.users.remove(&chat_id);
        Ok(())
    }

    async fn users(&self) -> anyhow::Result<Vec<i64>> {
        Ok(self.inner.read().await.users.iter().copied().collect())
    }
}
