//! Custom error types for the common library
//!
//! Infrastructure-level failures. Callers in the service map these onto
//! their own store errors; none of the detail here reaches an HTTP client.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred while creating the schema
    #[error("Database schema error: {0}")]
    Schema(#[source] SqlxError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised by the Redis cache wrapper
#[derive(Error, Debug)]
pub enum CacheError {
    /// The Redis URL could not be parsed or the client could not be built
    #[error("Cache configuration error: {0}")]
    Configuration(#[source] redis::RedisError),

    /// A setting in the environment could not be parsed
    #[error("Invalid cache setting: {0}")]
    InvalidSetting(String),

    /// No connection within the configured timeout (seconds)
    #[error("Cache connection timed out after {0}s")]
    Timeout(u64),

    /// A command failed or the server was unreachable
    #[error("Cache command error: {0}")]
    Command(#[source] redis::RedisError),

    #[error("Unexpected cache reply: {0}")]
    UnexpectedReply(String),
}

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
