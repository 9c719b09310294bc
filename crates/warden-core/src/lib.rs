//! # warden-core
//!
//! Core abstractions for the warden game-server host.
//!
//! This crate provides the foundational types used across all warden
//! components:
//!
//! - **Storage Repositories**: byte-addressed key/value backends (memory,
//!   filesystem), deliberately without conditional writes
//! - **Well-Known Keys**: the shared storage layout for manifests and backups
//! - **Progress Events**: optional one-way channel of structured events
//! - **Error Types**: shared error definitions and result types
//! - **Observability**: logging initialization and span helpers
//!
//! ## Crate Boundary
//!
//! `warden-core` is the only crate allowed to define shared primitives.
//! The coordination logic (manifests, validation, locking, retention)
//! lives in `warden-session` and consumes these contracts.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod events;
pub mod fs;
pub mod keys;
pub mod observability;
pub mod storage;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use warden_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::events::{Event, EventSink};
    pub use crate::fs::FsRepository;
    pub use crate::keys::{
        BACKUP_SUFFIX, INSTANCE_BUNDLE_KEY, MANIFEST_KEY, PRE_UPDATE_KEY, PRE_UPDATE_PREFIX,
        TEMP_SUFFIX, WORLD_BACKUP_PREFIX,
    };
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::storage::{MemoryRepository, StorageRepository};
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use events::{Event, EventSink};
pub use fs::FsRepository;
pub use observability::{init_logging, LogFormat};
pub use storage::{MemoryRepository, StorageRepository};
