//! Error types and result aliases shared across warden components.
//!
//! Errors are structured for programmatic handling and carry context
//! (which operation, which key) for debugging.

use std::fmt;

/// The result type used throughout warden-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core storage and I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A key or object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An invalid key or argument was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a not-found error for the given key.
    #[must_use]
    pub fn not_found(key: impl fmt::Display) -> Self {
        Self::NotFound(key.to_string())
    }

    /// Returns true if this error is a not-found condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
