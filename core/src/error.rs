//! Error types for the Freesound API pipeline.
//!
//! # Design
//! One `ApiError` travels from the builder, through the transport, to the
//! parser, so a loader call can surface any failure unmodified. Non-200
//! responses land in `ServerStatus` with the code and its reason phrase;
//! the body is discarded without decoding.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors produced while building, executing or parsing an API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The client is misconfigured for this call (missing credentials,
    /// unusable base URL, malformed environment value). Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP exchange did not complete.
    #[error("transport error: {0}")]
    Transport(TransportFailure),

    /// The server answered with something other than 200.
    #[error("HTTP {code}: {message}")]
    ServerStatus { code: u16, message: String },

    /// The payload does not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Why a transport-level exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// The request was cancelled before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// The configured request timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or body read failure.
    #[error("{0}")]
    Network(String),

    /// The pipeline ended without reporting an outcome.
    #[error("request task ended without a result")]
    Aborted,
}

impl ApiError {
    pub fn config(msg: impl Into<String>) -> Self {
        ApiError::Config(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        ApiError::Decode(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        ApiError::Transport(TransportFailure::Network(msg.into()))
    }

    pub fn cancelled() -> Self {
        ApiError::Transport(TransportFailure::Cancelled)
    }

    /// True for a `ServerStatus` with code 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::ServerStatus { code: 404, .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Transport(TransportFailure::Cancelled))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ServerStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}
