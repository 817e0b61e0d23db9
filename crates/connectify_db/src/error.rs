//! Error types for the database client

use connectify_common::{store_error, ConnectifyError};
use thiserror::Error;

/// Errors that can occur when working with the database client
#[derive(Debug, Error)]
pub enum DbError {
    /// Error from SQLx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Error with the database configuration
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Error with database URL parsing
    #[error("Database URL error: {0}")]
    UrlError(String),

    /// Error with database pool creation
    #[error("Database pool error: {0}")]
    PoolError(String),

    /// Error with database query
    #[error("Database query error: {0}")]
    QueryError(String),

    /// A stored value could not be encoded or decoded
    #[error("Stored value error: {0}")]
    ValueError(String),
}

/// Convert DbError to ConnectifyError
impl From<DbError> for ConnectifyError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConfigError(msg) | DbError::UrlError(msg) => ConnectifyError::ConfigError(msg),
            DbError::ValueError(msg) => ConnectifyError::ParseError(msg),
            other => store_error(other),
        }
    }
}
