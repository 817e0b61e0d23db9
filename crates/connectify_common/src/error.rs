// --- File: crates/connectify_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type shared by all Connectify crates.
///
/// Crate-specific errors convert into this type with `From` impls so that
/// service traits can expose a single error type.
#[derive(Error, Debug)]
pub enum ConnectifyError {
    /// Error occurred while parsing or serializing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred while reading or writing the preference store
    #[error("Store error: {0}")]
    StoreError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

// Common error conversions
impl From<serde_json::Error> for ConnectifyError {
    fn from(err: serde_json::Error) -> Self {
        ConnectifyError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for ConnectifyError {
    fn from(err: std::io::Error) -> Self {
        ConnectifyError::InternalError(err.to_string())
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> ConnectifyError {
    ConnectifyError::ConfigError(message.to_string())
}

pub fn store_error<T: fmt::Display>(message: T) -> ConnectifyError {
    ConnectifyError::StoreError(message.to_string())
}

pub fn internal_error<T: fmt::Display>(message: T) -> ConnectifyError {
    ConnectifyError::InternalError(message.to_string())
}
