//! Storage interfaces, one per feature area
//!
//! A backend implements only the traits for the features it supports.
//! [`Backend`] bundles the trait objects chosen at startup.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, StorageKind};
use crate::models::{
    Language, NewLanguage, NewQuiz, NewQuizResult, NewStatus, NewUser, Quiz, QuizResult, Status,
    UpdateUser, User, UserField, catalog,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors returned by every store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique field is already taken
    #[error("{0} already exists")]
    DuplicateKey(UserField),

    /// The record does not exist (or no longer exists)
    #[error("record not found")]
    NotFound,

    /// The backing store could not be reached or failed the operation
    #[error("store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

/// Type alias for store results
pub type StoreResult<T> = Result<T, StoreError>;

/// Account persistence
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive lookup on a unique field
    async fn find_by_field(&self, field: UserField, value: &str) -> StoreResult<Option<User>>;

    /// Fails with [`StoreError::DuplicateKey`] if username or email is taken
    async fn create(&self, new_user: NewUser) -> StoreResult<User>;

    /// Fails with [`StoreError::NotFound`] if `id` is absent
    async fn update(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User>;

    /// Fails with [`StoreError::NotFound`] if `id` is absent
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// Quizzes and their results
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn create_quiz(&self, new_quiz: NewQuiz) -> StoreResult<Quiz>;
    async fn list_quizzes(&self) -> StoreResult<Vec<Quiz>>;
    async fn find_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>>;
    async fn list_quizzes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Quiz>>;
    async fn create_result(&self, new_result: NewQuizResult) -> StoreResult<QuizResult>;
    async fn list_results_by_user(&self, user_id: Uuid) -> StoreResult<Vec<QuizResult>>;
}

/// Service statuses and language statistics
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_statuses(&self) -> StoreResult<Vec<Status>>;
    async fn create_status(&self, new_status: NewStatus) -> StoreResult<Status>;
    async fn list_languages(&self) -> StoreResult<Vec<Language>>;
    async fn create_language(&self, new_language: NewLanguage) -> StoreResult<Language>;
}

/// Fill an empty catalog with the default statuses and languages
///
/// Each list is only seeded while it is empty, in seed order.
pub async fn seed_catalog<S: CatalogStore + ?Sized>(store: &S) -> StoreResult<()> {
    if store.list_statuses().await?.is_empty() {
        for status in catalog::seed_statuses() {
            store.create_status(status).await?;
        }
    }

    if store.list_languages().await?.is_empty() {
        for language in catalog::seed_languages() {
            store.create_language(language).await?;
        }
    }
    Ok(())
}

/// The stores selected for this process
#[derive(Clone)]
pub struct Backend {
    pub accounts: Arc<dyn AccountStore>,
    pub quizzes: Arc<dyn QuizStore>,
    pub catalog: Arc<dyn CatalogStore>,
}

impl Backend {
    /// Every feature area served from one store value
    pub fn from_store<S>(store: S) -> Self
    where
        S: AccountStore + QuizStore + CatalogStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            accounts: store.clone(),
            quizzes: store.clone(),
            catalog: store,
        }
    }

    /// Fresh in-memory backend with seeded catalog data
    pub fn memory() -> Self {
        Self::from_store(MemoryStore::seeded())
    }

    /// Build the backend named by the configuration
    ///
    /// Resolved once at startup. The memory fallback only applies when it
    /// is explicitly enabled.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        match config.storage {
            StorageKind::Memory => {
                info!("Using in-memory storage");
                Ok(Self::memory())
            }
            StorageKind::Postgres => match PostgresStore::connect_from_env().await {
                Ok(store) => {
                    info!("Using PostgreSQL storage");
                    Ok(Self::from_store(store))
                }
                Err(e) if config.fallback_to_memory => {
                    warn!(error = %e, "PostgreSQL unavailable, falling back to in-memory storage");
                    Ok(Self::memory())
                }
                Err(e) => Err(e),
            },
        }
    }
}
