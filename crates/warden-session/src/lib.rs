//! # warden-session
//!
//! Manifest-coordinated session lifecycle for the warden game-server host.
//!
//! Multiple independent hosts may attempt to run the same game-server
//! instance; this crate guarantees that at most one host is active at a
//! time, that each host pulls whatever changed remotely before it starts,
//! and that completed sessions are archived and pruned, using only
//! read/write operations against the storage the data itself lives in.
//!
//! The pieces, leaves first:
//!
//! - [`version`]: total ordering of dotted version strings
//! - [`manifest`]: the shared versioned manifest, replicated local + remote
//! - [`validator`]: pure drift classification between the two replicas
//! - [`archive`] / [`transfer`]: directory trees to archives and back
//! - [`backup`] / [`runner`]: exit-time backups and server execution
//! - [`retention`]: count-based local and reference-aware remote pruning
//! - [`orchestrator`]: the Prepare → Run → Exit state machine with the
//!   storage-mediated lock protocol
//!
//! There is no central lock server and the substrate offers no atomic
//! compare-and-swap; see the [`orchestrator`] module docs for the
//! consistency model this implies.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod archive;
pub mod backup;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod retention;
pub mod runner;
pub mod transfer;
pub mod validator;
pub mod version;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::archive::{Archiver, TarGzArchiver};
    pub use crate::backup::{ArchiveWorldBackup, WorldBackup};
    pub use crate::error::{Result, SessionError};
    pub use crate::manifest::{Manifest, ManifestStore, Scope, Server, World};
    pub use crate::orchestrator::{detect_hostname, Orchestrator, Phase, SessionConfig};
    pub use crate::retention::{
        LocalRetention, RemoteRetention, RetentionPlan, RetentionPolicy, RetentionReport,
    };
    pub use crate::runner::{ProcessRunner, ServerRunner};
    pub use crate::transfer::{ConflictPolicy, Transfer};
    pub use crate::validator::{check_instance, check_lock, check_world, ValidationError};
    pub use crate::version::is_older;
}

// Re-export key types at crate root for ergonomics
pub use error::{Result, SessionError};
pub use manifest::{Manifest, ManifestStore, Scope, Server, World};
pub use orchestrator::{detect_hostname, Orchestrator, Phase, SessionConfig};
pub use validator::ValidationError;
pub use version::is_older;
