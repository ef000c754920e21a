//! Error types for httpload-core

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// The load profile was rejected before any request was sent
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A single request failed at the network layer
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A suspension point observed the run's cancellation signal
    #[error("run cancelled")]
    Cancelled,

    /// A pipeline invariant was broken; this is a bug, not a load condition
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// Create an invariant error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// Whether this error is the expected result of cancelling the run
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Whether this error must terminate the run
    ///
    /// Transport errors are tolerated per request and cancellation is a
    /// clean stop, everything else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Transport(_) | Error::Cancelled)
    }
}

/// Result type alias
pub type LoadResult<T> = std::result::Result<T, Error>;

/// Transport-level failures of a single GET
#[derive(Error, Debug)]
pub enum TransportError {
    /// DNS resolution failed or the connection was refused/reset
    #[error("connection failed: {0}")]
    Connect(String),

    /// No response headers within the per-request timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The target could not be turned into a request
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The connection broke while reading the response body
    #[error("body read failed: {0}")]
    Body(String),

    /// Any other request failure reported by the transport
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Short, stable label used to tally errors by kind
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "connect",
            TransportError::Timeout(_) => "timeout",
            TransportError::InvalidUrl(_) => "invalid_url",
            TransportError::Body(_) => "body",
            TransportError::Request(_) => "request",
        }
    }
}
