//! Redis access for the quizmaster service
//!
//! One multiplexed connection is opened at startup and shared by every
//! clone of [`RedisPool`]. The session store only needs `SET ... EX`,
//! `SET ... XX EX`, `GET` and `DEL`.

use std::time::Duration;

use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::info;

use crate::error::{CacheError, CacheResult};

/// Configuration for the Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// How long to wait for the initial connection, in seconds
    pub connection_timeout: u64,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    /// - `REDIS_CONNECTION_TIMEOUT`: Connect timeout in seconds (default: 5)
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let connection_timeout = match std::env::var("REDIS_CONNECTION_TIMEOUT") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                CacheError::InvalidSetting(format!("REDIS_CONNECTION_TIMEOUT={}", raw))
            })?,
            Err(_) => 5,
        };

        Ok(RedisConfig {
            url,
            connection_timeout,
        })
    }
}

/// Shared handle on a multiplexed Redis connection
#[derive(Clone)]
pub struct RedisPool {
    conn: MultiplexedConnection,
}

impl RedisPool {
    /// Open the connection described by `config`
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let client = open_client(&config.url)?;

        let timeout = Duration::from_secs(config.connection_timeout);
        let conn = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout(config.connection_timeout))?
            .map_err(CacheError::Command)?;

        info!("Connected to Redis");
        Ok(RedisPool { conn })
    }

    /// Store `value` under `key`, expiring after `ttl_seconds`
    pub async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl_seconds)
            .await
            .map_err(CacheError::Command)?;
        Ok(())
    }

    /// Overwrite `key` and its expiry only if it still exists
    ///
    /// Returns `false` when the key was absent; nothing is written then.
    pub async fn refresh_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("XX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(reply.is_some())
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(CacheError::Command)
    }

    /// Remove `key`; returns whether it existed
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await.map_err(CacheError::Command)?;
        Ok(removed > 0)
    }

    /// Round-trip a `PING`
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::UnexpectedReply(pong))
        }
    }
}

fn open_client(url: &str) -> CacheResult<Client> {
    Client::open(url).map_err(CacheError::Configuration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn local_config() -> RedisConfig {
        RedisConfig {
            url: "redis://localhost:6379".to_string(),
            connection_timeout: 2,
        }
    }

    #[test]
    fn test_invalid_url_is_a_configuration_error() {
        let err = open_client("not a url").err().expect("url must be rejected");
        assert!(matches!(err, CacheError::Configuration(_)));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe {
            std::env::remove_var("REDIS_URL");
            std::env::set_var("REDIS_CONNECTION_TIMEOUT", "9");
        }
        let config = RedisConfig::from_env().unwrap();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.connection_timeout, 9);

        unsafe {
            std::env::set_var("REDIS_CONNECTION_TIMEOUT", "soon");
        }
        assert!(matches!(
            RedisConfig::from_env(),
            Err(CacheError::InvalidSetting(_))
        ));

        unsafe {
            std::env::remove_var("REDIS_CONNECTION_TIMEOUT");
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn test_ping() -> anyhow::Result<()> {
        let pool = RedisPool::connect(&local_config()).await?;
        pool.ping().await?;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn test_set_get_delete() -> anyhow::Result<()> {
        let pool = RedisPool::connect(&local_config()).await?;

        let key = "quizmaster:test_key";
        pool.set_ex(key, "value", 5).await?;
        assert_eq!(pool.get(key).await?, Some("value".to_string()));

        assert!(pool.delete(key).await?);
        assert!(!pool.delete(key).await?);
        assert_eq!(pool.get(key).await?, None);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn test_refresh_only_touches_existing_keys() -> anyhow::Result<()> {
        let pool = RedisPool::connect(&local_config()).await?;

        let key = "quizmaster:test_refresh";
        pool.delete(key).await?;
        assert!(!pool.refresh_ex(key, "ghost", 5).await?);
        assert_eq!(pool.get(key).await?, None);

        pool.set_ex(key, "first", 5).await?;
        assert!(pool.refresh_ex(key, "second", 5).await?);
        assert_eq!(pool.get(key).await?, Some("second".to_string()));

        pool.delete(key).await?;
        Ok(())
    }
}
