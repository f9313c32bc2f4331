//! Error types for the record synchronizer
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::traits::RateLimit;

/// Result type alias for synchronizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the record synchronizer
#[derive(Error, Debug)]
pub enum Error {
    /// No record matched the target during a refresh
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Network or provider API failure
    ///
    /// A failed call may still have received a response; when it did, the
    /// quota headers of that response travel with the error.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
        /// Rate limit reported by the failing response, if any
        rate_limit: Option<RateLimit>,
    },

    /// Malformed input (e.g. a discovered address that is not an IP)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transport error without rate limit information
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            rate_limit: None,
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attach the rate limit reported by a failing response
    ///
    /// Has no effect on variants other than [`Error::Transport`].
    pub fn with_rate_limit(mut self, rate: Option<RateLimit>) -> Self {
        if let Self::Transport { rate_limit, .. } = &mut self {
            *rate_limit = rate;
        }
        self
    }

    /// Rate limit carried by a transport error
    pub fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            Self::Transport { rate_limit, .. } => rate_limit.as_ref(),
            _ => None,
        }
    }

    /// Whether this error is a [`Error::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error is a [`Error::Transport`]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
