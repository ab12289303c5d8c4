//! Session store on Redis
//!
//! Records are stored as JSON under `session:<sid>` with a TTL matching the
//! record's expiry, so Redis drops expired sessions on its own.

use async_trait::async_trait;
use chrono::Utc;
use common::cache::RedisPool;

use super::{SessionError, SessionRecord, SessionResult, SessionStore};

#[derive(Clone)]
pub struct RedisSessionStore {
    redis_pool: RedisPool,
}

impl RedisSessionStore {
    pub fn new(redis_pool: RedisPool) -> Self {
        Self { redis_pool }
    }

    fn key(sid: &str) -> String {
        format!("session:{}", sid)
    }

    /// Seconds until `record` expires, at least one
    fn ttl_seconds(record: &SessionRecord) -> u64 {
        let remaining = (record.expires_at - Utc::now()).num_seconds();
        u64::try_from(remaining).unwrap_or(0).max(1)
    }

    fn encode(record: &SessionRecord) -> SessionResult<String> {
        serde_json::to_string(record).map_err(SessionError::Corrupt)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, sid: &str) -> SessionResult<Option<SessionRecord>> {
        let raw = self
            .redis_pool
            .get(&Self::key(sid))
            .await
            .map_err(|e| SessionError::Unavailable(e.into()))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let record: SessionRecord = serde_json::from_str(&raw).map_err(SessionError::Corrupt)?;
        if record.is_expired(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn set(&self, sid: &str, record: &SessionRecord) -> SessionResult<()> {
        let value = Self::encode(record)?;
        self.redis_pool
            .set_ex(&Self::key(sid), &value, Self::ttl_seconds(record))
            .await
            .map_err(|e| SessionError::Unavailable(e.into()))
    }

    async fn destroy(&self, sid: &str) -> SessionResult<()> {
        self.redis_pool
            .delete(&Self::key(sid))
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Unavailable(e.into()))
    }

    /// A session destroyed since it was read stays destroyed
    async fn touch(&self, sid: &str, record: &SessionRecord) -> SessionResult<()> {
        let value = Self::encode(record)?;
        self.redis_pool
            .refresh_ex(&Self::key(sid), &value, Self::ttl_seconds(record))
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Unavailable(e.into()))
    }
}
