//! Count-based retention for the local working copy.

use std::sync::Arc;

use async_trait::async_trait;

use warden_core::keys::is_backup_key;
use warden_core::StorageRepository;

use crate::error::{Result, SessionError};
use crate::manifest::{Manifest, Scope};
use crate::retention::{RetentionPlan, RetentionPolicy, RetentionReport};

/// Keeps the newest N local backup archives, deletes the rest.
///
/// Local backups are ephemeral working copies, so the policy is purely
/// count-based; the manifest argument is not consulted. Keys embed their
/// creation timestamp, so lexicographically descending order is
/// newest-first.
pub struct LocalRetention {
    storage: Arc<dyn StorageRepository>,
    keep: usize,
}

impl LocalRetention {
    /// Creates a policy over the local repository keeping `keep` archives.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageRepository>, keep: usize) -> Self {
        Self { storage, keep }
    }

    async fn sorted_backup_keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .storage
            .list(warden_core::keys::WORLD_BACKUP_PREFIX)
            .await
            .map_err(|e| SessionError::storage(Scope::Local, e))?
            .into_iter()
            .filter(|k| is_backup_key(k))
            .collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));
        Ok(keys)
    }
}

#[async_trait]
impl RetentionPolicy for LocalRetention {
    async fn plan(&self, _manifest: &Manifest) -> Result<RetentionPlan> {
        let keys = self.sorted_backup_keys().await?;
        let keep = keys.iter().take(self.keep).cloned().collect();
        let delete = keys.iter().skip(self.keep).cloned().collect();
        Ok(RetentionPlan {
            keep,
            delete,
            dangling: Vec::new(),
        })
    }

    async fn apply(&self, manifest: &Manifest) -> Result<RetentionReport> {
        let plan = self.plan(manifest).await?;

        for key in &plan.delete {
            self.storage
                .delete(key)
                .await
                .map_err(|e| SessionError::storage(Scope::Local, e))?;
        }

        tracing::info!(
            kept = plan.keep.len(),
            deleted = plan.delete.len(),
            cap = self.keep,
            metric = "warden_retention_local_completed",
            "local retention completed"
        );

        Ok(RetentionReport {
            kept: plan.keep,
            deleted: plan.delete,
            dangling_deleted: Vec::new(),
        })
    }
}
