//! Server-side sessions
//!
//! A session id is 32 random bytes, hex-encoded, carried in a cookie. The
//! record it points to holds the user id and an absolute expiry that is
//! pushed forward on every authenticated request.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub mod memory;
pub mod redis;

pub use memory::MemorySessionStore;
pub use redis::RedisSessionStore;

const SESSION_ID_BYTES: usize = 32;
/// Upper bound on session lifetime (ten years)
const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Errors raised by session stores
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),

    #[error("corrupt session record: {0}")]
    Corrupt(#[source] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What a session id resolves to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Persistence for session records
///
/// Implementations must not return records past `expires_at`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, sid: &str) -> SessionResult<Option<SessionRecord>>;

    async fn set(&self, sid: &str, record: &SessionRecord) -> SessionResult<()>;

    async fn destroy(&self, sid: &str) -> SessionResult<()>;

    /// Extend the lifetime of an existing session to `record.expires_at`
    async fn touch(&self, sid: &str, record: &SessionRecord) -> SessionResult<()>;
}

/// Session manager for creating, resolving and ending sessions
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl_seconds: u64) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64),
        }
    }

    /// Session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for `user_id` and return its id
    pub async fn create(&self, user_id: Uuid) -> SessionResult<String> {
        let sid = generate_session_id();
        let record = SessionRecord {
            user_id,
            expires_at: Utc::now() + self.ttl,
        };
        self.store.set(&sid, &record).await?;

        info!(%user_id, "Session created");
        Ok(sid)
    }

    /// Resolve a session id, refreshing its expiry when valid
    pub async fn resolve(&self, sid: &str) -> SessionResult<Option<SessionRecord>> {
        let now = Utc::now();
        let Some(record) = self.store.get(sid).await? else {
            return Ok(None);
        };

        if record.is_expired(now) {
            debug!(user_id = %record.user_id, "Session expired");
            self.store.destroy(sid).await?;
            return Ok(None);
        }

        let refreshed = SessionRecord {
            user_id: record.user_id,
            expires_at: now + self.ttl,
        };
        self.store.touch(sid, &refreshed).await?;
        Ok(Some(refreshed))
    }

    /// End a session; unknown ids are ignored
    pub async fn destroy(&self, sid: &str) -> SessionResult<()> {
        self.store.destroy(sid).await
    }
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(ttl_seconds: u64) -> (SessionManager, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        (SessionManager::new(store.clone(), ttl_seconds), store)
    }

    #[test]
    fn ttl_is_capped() {
        let (sessions, _) = manager(u64::MAX);
        assert_eq!(sessions.ttl(), Duration::seconds(MAX_TTL_SECONDS as i64));
    }

    #[test]
    fn session_ids_are_long_and_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.len(), SESSION_ID_BYTES * 2);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn create_then_resolve() {
        let (sessions, _) = manager(60);
        let user_id = Uuid::new_v4();

        let sid = sessions.create(user_id).await.unwrap();
        let record = sessions.resolve(&sid).await.unwrap().unwrap();
        assert_eq!(record.user_id, user_id);
        assert!(record.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn resolve_pushes_expiry_forward() {
        let (sessions, store) = manager(3600);
        let user_id = Uuid::new_v4();
        let sid = "fixed";

        let soon = SessionRecord {
            user_id,
            expires_at: Utc::now() + Duration::seconds(5),
        };
        store.set(sid, &soon).await.unwrap();

        let refreshed = sessions.resolve(sid).await.unwrap().unwrap();
        assert!(refreshed.expires_at > soon.expires_at + Duration::seconds(60));
        assert_eq!(store.get(sid).await.unwrap(), Some(refreshed));
    }

    #[tokio::test]
    async fn unknown_and_destroyed_sessions_resolve_to_none() {
        let (sessions, _) = manager(60);
        assert!(sessions.resolve("nope").await.unwrap().is_none());

        let sid = sessions.create(Uuid::new_v4()).await.unwrap();
        sessions.destroy(&sid).await.unwrap();
        assert!(sessions.resolve(&sid).await.unwrap().is_none());

        // destroying twice is fine
        sessions.destroy(&sid).await.unwrap();
    }

    #[tokio::test]
    async fn expired_record_is_rejected_and_removed() {
        let (sessions, store) = manager(60);
        let record = SessionRecord {
            user_id: Uuid::new_v4(),
            expires_at: Utc::now() - Duration::seconds(1),
        };
        store.insert_raw("stale", record).await;

        assert!(sessions.resolve("stale").await.unwrap().is_none());
        assert_eq!(store.len().await, 0);
    }
}
