//! Session error model.

use serde::Serialize;
use thiserror::Error;

/// Failure fetching an identity's permissions.
///
/// Recoverable and retryable; it is recorded on the session state and never
/// clears permissions that were already loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    /// The permission source could not be reached.
    #[error("network error: {message}")]
    Network { message: String },

    /// The permission source answered with a non-success status.
    #[error("permission source returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("malformed permission response: {message}")]
    Decode { message: String },
}

impl FetchError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network { message: msg.into() }
    }

    pub fn status(status: u16, msg: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode { message: msg.into() }
    }
}

/// Errors returned by explicit session operations (`refetch`, fetch tasks).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no identity is known; nothing to fetch")]
    NoIdentity,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The result arrived after a newer initialization or fetch and was discarded.
    #[error("fetch result superseded and discarded")]
    Superseded,

    #[error("fetch task aborted")]
    Aborted,
}
