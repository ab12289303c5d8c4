//! PostgreSQL store

use anyhow::Context;
use async_trait::async_trait;
use common::database::{DatabaseConfig, health_check, init_pool};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{AccountStore, CatalogStore, QuizStore, StoreError, StoreResult};
use crate::models::{
    Language, NewLanguage, NewQuiz, NewQuizResult, NewStatus, NewUser, Quiz, QuizResult, Status,
    UpdateUser, User, UserField,
};

/// Idempotent schema; usernames and emails are unique case-insensitively
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL,
    email TEXT NOT NULL,
    password TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    profile_picture TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE UNIQUE INDEX IF NOT EXISTS users_username_lower_key ON users (lower(username));
CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_key ON users (lower(email));

CREATE TABLE IF NOT EXISTS quizzes (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS quizzes_created_by_idx ON quizzes (created_by);

CREATE TABLE IF NOT EXISTS quiz_results (
    id UUID PRIMARY KEY,
    quiz_id UUID NOT NULL REFERENCES quizzes (id) ON DELETE CASCADE,
    user_id UUID NOT NULL,
    score INTEGER NOT NULL,
    completed_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS quiz_results_user_id_idx ON quiz_results (user_id);

CREATE TABLE IF NOT EXISTS statuses (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    color TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
ALTER TABLE statuses ADD COLUMN IF NOT EXISTS seq BIGSERIAL;

CREATE TABLE IF NOT EXISTS languages (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    count INTEGER NOT NULL,
    percentage INTEGER NOT NULL
);
ALTER TABLE languages ADD COLUMN IF NOT EXISTS seq BIGSERIAL;
"#;

/// PostgreSQL-backed implementation of every store trait
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool; the schema must already exist
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `DATABASE_*` settings, check connectivity, create the
    /// schema and seed the catalog
    pub async fn connect_from_env() -> anyhow::Result<Self> {
        let config = DatabaseConfig::from_env()?;
        let pool = init_pool(&config).await?;
        health_check(&pool).await?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        store.seed_catalog().await?;
        Ok(store)
    }

    /// Create tables and indexes if missing
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(common::error::DatabaseError::Schema)?;
        info!("Database schema ready");
        Ok(())
    }

    /// Catalog rows list in insertion order (`seq`), so seeding runs row
    /// by row through the store rather than in one batch
    async fn seed_catalog(&self) -> anyhow::Result<()> {
        super::seed_catalog(self).await.context("seed catalog")?;
        info!("Catalog seeded");
        Ok(())
    }
}

/// Translate driver errors into store errors
///
/// Unique violations name the index that fired, which tells us the field.
fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some(name) if name.contains("email") => UserField::Email,
                _ => UserField::Username,
            };
            return StoreError::DuplicateKey(field);
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    StoreError::Unavailable(e.into())
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password AS password_hash, role, profile_picture, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_by_field(&self, field: UserField, value: &str) -> StoreResult<Option<User>> {
        let sql = match field {
            UserField::Username => {
                r#"
                SELECT id, username, email, password AS password_hash, role, profile_picture, created_at
                FROM users
                WHERE lower(username) = lower($1)
                "#
            }
            UserField::Email => {
                r#"
                SELECT id, username, email, password AS password_hash, role, profile_picture, created_at
                FROM users
                WHERE lower(email) = lower($1)
                "#
            }
        };

        sqlx::query_as::<_, User>(sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password AS password_hash, role, profile_picture, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password = COALESCE($4, password),
                profile_picture = COALESCE($5, profile_picture)
            WHERE id = $1
            RETURNING id, username, email, password AS password_hash, role, profile_picture, created_at
            "#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.profile_picture)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl QuizStore for PostgresStore {
    async fn create_quiz(&self, new_quiz: NewQuiz) -> StoreResult<Quiz> {
        sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (id, name, category, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, category, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_quiz.name)
        .bind(&new_quiz.category)
        .bind(new_quiz.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_quizzes(&self) -> StoreResult<Vec<Quiz>> {
        sqlx::query_as::<_, Quiz>(
            "SELECT id, name, category, created_by, created_at FROM quizzes ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>> {
        sqlx::query_as::<_, Quiz>(
            "SELECT id, name, category, created_by, created_at FROM quizzes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_quizzes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Quiz>> {
        sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, name, category, created_by, created_at
            FROM quizzes
            WHERE created_by = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn create_result(&self, new_result: NewQuizResult) -> StoreResult<QuizResult> {
        sqlx::query_as::<_, QuizResult>(
            r#"
            INSERT INTO quiz_results (id, quiz_id, user_id, score)
            VALUES ($1, $2, $3, $4)
            RETURNING id, quiz_id, user_id, score, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_result.quiz_id)
        .bind(new_result.user_id)
        .bind(new_result.score)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_results_by_user(&self, user_id: Uuid) -> StoreResult<Vec<QuizResult>> {
        sqlx::query_as::<_, QuizResult>(
            r#"
            SELECT id, quiz_id, user_id, score, completed_at
            FROM quiz_results
            WHERE user_id = $1
            ORDER BY completed_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn list_statuses(&self) -> StoreResult<Vec<Status>> {
        sqlx::query_as::<_, Status>(
            "SELECT id, name, description, color, created_at FROM statuses ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn create_status(&self, new_status: NewStatus) -> StoreResult<Status> {
        sqlx::query_as::<_, Status>(
            r#"
            INSERT INTO statuses (id, name, description, color)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, color, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_status.name)
        .bind(&new_status.description)
        .bind(&new_status.color)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_languages(&self) -> StoreResult<Vec<Language>> {
        sqlx::query_as::<_, Language>(
            "SELECT id, name, count, percentage FROM languages ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn create_language(&self, new_language: NewLanguage) -> StoreResult<Language> {
        sqlx::query_as::<_, Language>(
            r#"
            INSERT INTO languages (id, name, count, percentage)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, count, percentage
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_language.name)
        .bind(new_language.count)
        .bind(new_language.percentage)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }
}
