//! Common library for the quizmaster service
//!
//! Shared infrastructure used by the HTTP service: PostgreSQL connection
//! pooling, the Redis client backing persistent sessions, and the error
//! types those two surfaces return.

pub mod cache;
pub mod database;
pub mod error;

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, health_check};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     let is_healthy = health_check(&pool).await?;
///     println!("Database health check: {}", is_healthy);
///     Ok(())
/// }
/// ```
pub use database::{DatabaseConfig, health_check, init_pool};
