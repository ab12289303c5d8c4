//! In-process session store

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use super::{SessionRecord, SessionResult, SessionStore};

/// Session records in a map; expired entries are dropped on read and by
/// [`prune_expired`](Self::prune_expired)
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired record, returning how many were dropped
    pub async fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now));
        before - sessions.len()
    }

    /// Run [`prune_expired`](Self::prune_expired) every `period` in the background
    pub fn spawn_pruner(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let pruned = store.prune_expired().await;
                if pruned > 0 {
                    info!(pruned, "Pruned expired sessions");
                }
            }
        })
    }

    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, sid: &str, record: SessionRecord) {
        self.sessions.write().await.insert(sid.to_string(), record);
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, sid: &str) -> SessionResult<Option<SessionRecord>> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(sid) {
                None => return Ok(None),
                Some(record) if !record.is_expired(now) => return Ok(Some(record.clone())),
                Some(_) => {}
            }
        }

        self.sessions.write().await.remove(sid);
        Ok(None)
    }

    async fn set(&self, sid: &str, record: &SessionRecord) -> SessionResult<()> {
        self.sessions
            .write()
            .await
            .insert(sid.to_string(), record.clone());
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> SessionResult<()> {
        self.sessions.write().await.remove(sid);
        Ok(())
    }

    async fn touch(&self, sid: &str, record: &SessionRecord) -> SessionResult<()> {
        if let Some(existing) = self.sessions.write().await.get_mut(sid) {
            existing.expires_at = record.expires_at;
        }
        Ok(())
    }
}
