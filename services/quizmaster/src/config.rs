//! Service configuration read from the environment

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Persistence backend for accounts, quizzes and the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Postgres,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "postgres" | "postgresql" => Ok(StorageKind::Postgres),
            other => anyhow::bail!("unknown storage backend: {}", other),
        }
    }
}

/// Backing store for sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Redis,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(SessionBackend::Memory),
            "redis" => Ok(SessionBackend::Redis),
            other => anyhow::bail!("unknown session backend: {}", other),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    /// Name of the cookie carrying the session id
    pub cookie_name: String,
    /// Session lifetime in seconds (default: one week)
    pub ttl_seconds: u64,
    /// Mark the cookie `Secure` (HTTPS deployments)
    pub secure_cookie: bool,
    /// How often the in-memory store drops expired sessions
    pub prune_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            cookie_name: "quizmaster.sid".to_string(),
            ttl_seconds: 60 * 60 * 24 * 7,
            secure_cookie: false,
            prune_interval_seconds: 60 * 60 * 24,
        }
    }
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_BACKEND`: `memory` or `redis` (default: memory)
    /// - `SESSION_COOKIE_NAME`: cookie name (default: quizmaster.sid)
    /// - `SESSION_TTL_SECONDS`: session lifetime (default: 604800)
    /// - `SESSION_COOKIE_SECURE`: `true` to set the Secure flag (default: false)
    /// - `SESSION_PRUNE_INTERVAL_SECONDS`: memory store pruning period (default: 86400)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend = match std::env::var("SESSION_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.backend,
        };

        let cookie_name =
            std::env::var("SESSION_COOKIE_NAME").unwrap_or(defaults.cookie_name);

        let ttl_seconds = env_parse("SESSION_TTL_SECONDS", defaults.ttl_seconds)?;
        if ttl_seconds == 0 {
            anyhow::bail!("SESSION_TTL_SECONDS must be positive");
        }

        let secure_cookie = env_parse("SESSION_COOKIE_SECURE", defaults.secure_cookie)?;
        let prune_interval_seconds = env_parse(
            "SESSION_PRUNE_INTERVAL_SECONDS",
            defaults.prune_interval_seconds,
        )?;

        Ok(Self {
            backend,
            cookie_name,
            ttl_seconds,
            secure_cookie,
            prune_interval_seconds,
        })
    }
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageKind,
    /// Use the memory backend when the database cannot be reached at startup
    pub fallback_to_memory: bool,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BIND_ADDR`: listen address (default: 0.0.0.0:3000)
    /// - `STORAGE_BACKEND`: `memory` or `postgres` (default: memory)
    /// - `STORAGE_FALLBACK_TO_MEMORY`: `true` to fall back when postgres is down (default: false)
    /// - plus everything read by [`SessionConfig::from_env`]
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let storage = match std::env::var("STORAGE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StorageKind::Memory,
        };

        let fallback_to_memory = env_parse("STORAGE_FALLBACK_TO_MEMORY", false)?;

        Ok(Self {
            bind_addr,
            storage,
            fallback_to_memory,
            session: SessionConfig::from_env()?,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
