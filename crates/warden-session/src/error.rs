//! Error types for session operations.

use thiserror::Error;

use crate::manifest::Scope;
use crate::validator::ValidationError;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A storage operation failed.
    #[error("storage error ({scope} scope): {source}")]
    Storage {
        /// Which replication scope the failing repository serves.
        scope: Scope,
        /// The underlying storage error.
        #[source]
        source: warden_core::Error,
    },

    /// The stored manifest could not be decoded as JSON.
    #[error("manifest decode error ({scope} scope): {message}")]
    Decode {
        /// Which replication scope held the bad document.
        scope: Scope,
        /// Description of the decode failure.
        message: String,
    },

    /// The stored manifest value was zero-length.
    #[error("manifest is empty ({scope} scope)")]
    EmptyManifest {
        /// Which replication scope held the empty value.
        scope: Scope,
    },

    /// No manifest exists at the well-known key.
    ///
    /// Distinct from [`SessionError::Storage`] so Prepare can seed a fresh
    /// local replica on first run instead of failing.
    #[error("manifest not found ({scope} scope)")]
    ManifestMissing {
        /// Which replication scope is missing its manifest.
        scope: Scope,
    },

    /// A consistency check classified local/remote drift or a conflict.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Remote lock save failed and the local lock was rolled back.
    ///
    /// When the rollback itself also fails, both causes are carried;
    /// neither is ever swallowed.
    #[error("lock acquisition failed: {cause}{}", .rollback.as_ref().map(|r| format!("; local rollback also failed: {r}")).unwrap_or_default())]
    LockRollback {
        /// The original remote save failure.
        cause: Box<SessionError>,
        /// The rollback failure, if the local re-save also failed.
        rollback: Option<Box<SessionError>>,
    },

    /// The stored lock token does not match the token held by this run.
    #[error("lock owned by another session: stored {stored:?}, held {held:?}")]
    LockOwnership {
        /// Token found in the local manifest.
        stored: String,
        /// Token held in-process by this orchestrator.
        held: String,
    },

    /// The server runner failed.
    #[error("server runner failed: {message}")]
    Runner {
        /// Description of the runner failure.
        message: String,
    },

    /// An archive or transfer operation failed.
    #[error("archive error: {message}")]
    Archive {
        /// Description of the archive failure.
        message: String,
    },

    /// A phase was invoked out of order.
    #[error("invalid phase transition: {message}")]
    Phase {
        /// Description of the violated ordering.
        message: String,
    },
}

impl SessionError {
    /// Wraps a core storage error with its replication scope.
    #[must_use]
    pub fn storage(scope: Scope, source: warden_core::Error) -> Self {
        Self::Storage { scope, source }
    }

    /// Creates an archive error with the given message.
    #[must_use]
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    /// Returns the validation error carried by this error, if any.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(v) => Some(v),
            _ => None,
        }
    }
}
