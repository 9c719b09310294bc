//! Backup retention for both replication scopes.
//!
//! Two independent policies share one shape: given the current manifest,
//! list the backup keys under a prefix and decide which to delete.
//!
//! - [`LocalRetention`]: purely count-based. Local backups are ephemeral
//!   working copies; the manifest is accepted for interface uniformity but
//!   not consulted.
//! - [`RemoteRetention`]: deletes dangling artifacts (keys no manifest
//!   world entry references; orphans from crashed runs or superseded
//!   manifests) regardless of count, then caps the referenced keys at the
//!   newest N.
//!
//! Without retention, every session adds an archive and storage grows
//! unbounded. In-progress uploads (temp suffix) are never counted.

mod local;
mod remote;

pub use local::LocalRetention;
pub use remote::RemoteRetention;

use async_trait::async_trait;

use crate::error::Result;
use crate::manifest::Manifest;

/// Result of a retention run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Keys that survived.
    pub kept: Vec<String>,
    /// Referenced keys deleted because they fell beyond the cap.
    pub deleted: Vec<String>,
    /// Unreferenced keys deleted regardless of count.
    pub dangling_deleted: Vec<String>,
}

impl RetentionReport {
    /// Total number of deletions performed.
    #[must_use]
    pub fn total_deleted(&self) -> usize {
        self.deleted.len() + self.dangling_deleted.len()
    }
}

/// Dry-run plan showing what a retention run would delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Keys that would survive.
    pub keep: Vec<String>,
    /// Referenced keys that would be deleted beyond the cap.
    pub delete: Vec<String>,
    /// Unreferenced keys that would be deleted.
    pub dangling: Vec<String>,
}

/// A pruning policy over one scope's backup keys.
#[async_trait]
pub trait RetentionPolicy: Send + Sync + 'static {
    /// Computes what a run would delete, without deleting.
    ///
    /// # Errors
    ///
    /// Returns an error if listing the backup keys fails.
    async fn plan(&self, manifest: &Manifest) -> Result<RetentionPlan>;

    /// Applies the policy, deleting via the scope's repository.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails; individual delete failures abort
    /// the run with the failing key in context.
    async fn apply(&self, manifest: &Manifest) -> Result<RetentionReport>;
}
