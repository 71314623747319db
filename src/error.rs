// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types with consistent status mapping.
//!
//! Every terminal outcome that crosses into caller-visible state is a
//! [`ClientError`]. Recoverable failures (401, 5xx, transport errors) are
//! retried inside the client and only surface here once the retry budget
//! is spent.

use crate::config::ConfigError;

/// Error returned by session and API operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("No active session")]
    NoSession,

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// Message surfaced after the 401 retry budget is exhausted.
    pub const TRY_AGAIN: &'static str = "Please try again";
    /// Message surfaced after the transient retry budget is exhausted.
    pub const NETWORK_ERROR: &'static str = "Network or unexpected error";
    /// Message used when the server did not supply one.
    pub const UNKNOWN_ERROR: &'static str = "Unknown error";

    /// HTTP-like status reported to the caller for this outcome.
    pub fn status(&self) -> u16 {
        match self {
            ClientError::Validation(_) => 400,
            ClientError::Api { status, .. } => *status,
            ClientError::Unauthorized(_) | ClientError::NoSession => 401,
            ClientError::Unavailable(_)
            | ClientError::Storage(_)
            | ClientError::Config(_)
            | ClientError::Internal(_) => 500,
        }
    }

    /// Human readable message without the status prefix.
    pub fn message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Validation(msg)
            | ClientError::Unauthorized(msg)
            | ClientError::Unavailable(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// True when the caller has to log in again: exhausted 401 recovery
    /// or no session at all.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_) | ClientError::NoSession)
    }
}

/// Failure of the token refresh protocol.
///
/// Cloneable because a single refresh outcome is delivered to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("No session to refresh")]
    NoSession,

    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Refresh request failed: {0}")]
    Transport(String),

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),
}

/// Failure of a session storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
