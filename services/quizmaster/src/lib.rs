//! Quizmaster backend
//!
//! REST service for accounts, quizzes and quiz results with cookie-based
//! server-side sessions. Persistence sits behind per-feature store traits
//! with in-memory and PostgreSQL implementations; sessions live in memory or
//! in Redis.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::cache::{RedisConfig, RedisPool};
use tracing::info;

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod password;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;

use crate::config::{AppConfig, SessionBackend};
use crate::password::CredentialHasher;
use crate::session::{MemorySessionStore, RedisSessionStore, SessionManager, SessionStore};
use crate::storage::Backend;

/// Connect the configured stores and assemble the handler state
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let backend = Backend::connect(config).await?;

    let session_store: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Memory => {
            let store = Arc::new(MemorySessionStore::new());
            store.spawn_pruner(Duration::from_secs(
                config.session.prune_interval_seconds.max(1),
            ));
            info!("Using in-memory session store");
            store
        }
        SessionBackend::Redis => {
            let redis_config = RedisConfig::from_env()?;
            let redis_pool = RedisPool::connect(&redis_config).await?;
            redis_pool.ping().await?;
            info!("Using Redis session store");
            Arc::new(RedisSessionStore::new(redis_pool))
        }
    };

    let sessions = SessionManager::new(session_store, config.session.ttl_seconds);

    Ok(AppState::new(
        backend,
        sessions,
        CredentialHasher::default(),
        config.session.clone(),
    ))
}
