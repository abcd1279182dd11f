//! Error types for the PayApi client.
//!
//! # Design
//! Every failure an operation can produce is one variant of `ApiError`, so
//! callers match on the kind instead of parsing text. The messages carried by
//! `Configuration`, `Validation`, `AuthRequired`, `Auth` and `NotFound` are
//! the exact strings the service's other clients produce; they are part of the
//! observable contract and must not be reworded.
//!
//! Transport failures (timeouts, refused connections, statuses outside the
//! accepted window) stay separate from classified HTTP outcomes.

use thiserror::Error;

/// Message used when a protected operation runs before `authenticate`.
pub const AUTH_REQUIRED_MESSAGE: &str = "You must do the authentication first";

/// Errors returned by `ApiClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad constructor input. Raised only by `ApiClient::new`.
    #[error("{0}")]
    Configuration(String),

    /// Bad call arguments, or a 4xx business error reported by the service.
    #[error("{0}")]
    Validation(String),

    /// A protected operation was attempted without a session token.
    #[error("{}", AUTH_REQUIRED_MESSAGE)]
    AuthRequired,

    /// The service answered 401 or 403.
    #[error("{0}")]
    Auth(String),

    /// The service answered 404.
    #[error("{0}")]
    NotFound(String),

    /// Any status the classifier has no mapping for.
    #[error("Unexpected status code received.")]
    UnexpectedStatus { status: u16 },

    /// A signed payload could not be decoded or verified.
    #[error("{0}")]
    Token(String),

    /// The request never produced a classifiable response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub(crate) fn token(msg: impl Into<String>) -> Self {
        ApiError::Token(msg.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Serialization(e.to_string())
    }
}

/// Failures below the HTTP classification layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The server answered with a status outside the accepted 200–503 window.
    #[error("request failed with status code {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),
}
