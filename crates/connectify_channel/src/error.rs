// --- File: crates/connectify_channel/src/error.rs ---
use chrono::{DateTime, Utc};
use connectify_common::ConnectifyError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api_client::ChannelApiResponse;

/// Errors raised by a [`ChannelApiClient`](crate::api_client::ChannelApiClient).
///
/// Only failures where no usable response came back are errors. Non-2xx
/// responses are returned as regular responses.
#[derive(Error, Debug)]
pub enum ChannelApiError {
    /// The request never produced a response (connect, timeout, TLS, ...)
    #[error("Channel API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// A successful create response did not carry a channel ID
    #[error("Channel API response is missing a channel ID (status {status})")]
    MissingChannelId { status: u16 },

    /// The response body could not be decoded
    #[error("Invalid channel API response: {0}")]
    InvalidResponse(String),

    /// Missing or invalid client configuration
    #[error("Channel API configuration error: {0}")]
    ConfigError(String),
}

/// Why a registration attempt did not end in a confirmed success.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The delegate did not provide a payload
    #[error("Registration payload unavailable")]
    PayloadUnavailable,

    /// No response from the channel API
    #[error("Transport error: {0}")]
    Transport(#[from] ChannelApiError),

    /// 5xx or 429 response
    #[error("Server error (status {status})")]
    ServerError { status: u16 },

    /// 409 response. The channel was invalidated and a forced registration queued.
    #[error("Channel conflict")]
    Conflict,

    /// Any other unsuccessful response
    #[error("Client error (status {status})")]
    ClientError { status: u16 },

    /// Reading or writing registrar state failed
    #[error("Store error: {0}")]
    Store(#[from] ConnectifyError),
}

impl RegistrationError {
    /// Classify an unsuccessful, non-conflict response.
    pub fn from_response(response: &ChannelApiResponse) -> Self {
        let status = response.status;
        if response.is_server_error() || response.is_rate_limited() {
            RegistrationError::ServerError { status }
        } else {
            RegistrationError::ClientError { status }
        }
    }

    /// Returns true if the task should be failed so that the task queue retries it.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistrationError::PayloadUnavailable
            | RegistrationError::Transport(_)
            | RegistrationError::ServerError { .. }
            | RegistrationError::Store(_) => true,
            RegistrationError::Conflict | RegistrationError::ClientError { .. } => false,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            RegistrationError::PayloadUnavailable => FailureKind::PayloadUnavailable,
            RegistrationError::Transport(_) => FailureKind::Transport,
            RegistrationError::ServerError { .. } => FailureKind::ServerError,
            RegistrationError::Conflict => FailureKind::Conflict,
            RegistrationError::ClientError { .. } => FailureKind::ClientError,
            RegistrationError::Store(_) => FailureKind::Store,
        }
    }

    /// The HTTP status that caused the failure, if there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistrationError::ServerError { status } | RegistrationError::ClientError { status } => {
                Some(*status)
            }
            RegistrationError::Conflict => Some(409),
            _ => None,
        }
    }
}

/// Coarse failure category kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PayloadUnavailable,
    Transport,
    ServerError,
    Conflict,
    ClientError,
    Store,
}

/// The last unsuccessful registration attempt, as persisted by the registrar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationFailure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(status: u16) -> RegistrationError {
        RegistrationError::from_response(&ChannelApiResponse::new(status, None))
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify(500),
            RegistrationError::ServerError { status: 500 }
        ));
        assert!(matches!(
            classify(503),
            RegistrationError::ServerError { status: 503 }
        ));
        assert!(matches!(
            classify(429),
            RegistrationError::ServerError { status: 429 }
        ));
        assert!(matches!(
            classify(400),
            RegistrationError::ClientError { status: 400 }
        ));
        assert!(matches!(
            classify(403),
            RegistrationError::ClientError { status: 403 }
        ));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(RegistrationError::PayloadUnavailable.is_retryable());
        assert!(RegistrationError::ServerError { status: 502 }.is_retryable());
        assert!(RegistrationError::Transport(ChannelApiError::MissingChannelId { status: 201 })
            .is_retryable());
        assert!(RegistrationError::Store(connectify_common::store_error("locked")).is_retryable());
        assert!(!RegistrationError::Conflict.is_retryable());
        assert!(!RegistrationError::ClientError { status: 400 }.is_retryable());
    }

    #[test]
    fn test_failure_status() {
        assert_eq!(RegistrationError::Conflict.status(), Some(409));
        assert_eq!(RegistrationError::ClientError { status: 404 }.status(), Some(404));
        assert_eq!(RegistrationError::PayloadUnavailable.status(), None);
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::ServerError).unwrap();
        assert_eq!(json, "\"server_error\"");
    }
}
