//! 进程内存 Checkpointer，重启即清空，用于不落盘的测试。

use crate::error::Result;
use crate::memory::{Checkpoint, Checkpointer, MemoryState};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    sessions: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, session_id: &str, state: MemoryState) -> Result<String> {
        let checkpoint = Checkpoint::new(session_id, state);
        let checkpoint_id = checkpoint.checkpoint_id.clone();
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), checkpoint);
        Ok(checkpoint_id)
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn remove(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}
