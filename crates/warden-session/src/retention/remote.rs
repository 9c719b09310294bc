//! Reference-aware retention for the shared remote store.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use warden_core::keys::is_backup_key;
use warden_core::StorageRepository;

use crate::error::{Result, SessionError};
use crate::manifest::{Manifest, Scope};
use crate::retention::{RetentionPlan, RetentionPolicy, RetentionReport};

/// Prunes the remote backup set against the manifest's world list.
///
/// Every backup key the manifest does not reference is dangling (an orphan
/// from a crashed run or a superseded manifest) and is deleted regardless
/// of count. The remaining referenced keys are capped at the newest `keep`;
/// keys beyond the cap are deleted even though still referenced.
///
/// Note: deleting beyond-cap keys does NOT remove the corresponding world
/// entries from the manifest passed in, so the manifest's world list grows
/// unbounded across repeated cycles while the backing files are gone. The
/// `manifest_world_list_growth` regression test pins this behavior.
pub struct RemoteRetention {
    storage: Arc<dyn StorageRepository>,
    keep: usize,
}

impl RemoteRetention {
    /// Creates a policy over the remote repository keeping `keep` referenced archives.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageRepository>, keep: usize) -> Self {
        Self { storage, keep }
    }

    async fn classify(&self, manifest: &Manifest) -> Result<RetentionPlan> {
        let referenced: HashSet<&str> =
            manifest.worlds.iter().map(|w| w.uri.as_str()).collect();

        let mut valid = Vec::new();
        let mut dangling = Vec::new();
        for key in self
            .storage
            .list(warden_core::keys::WORLD_BACKUP_PREFIX)
            .await
            .map_err(|e| SessionError::storage(Scope::Remote, e))?
        {
            if !is_backup_key(&key) {
                continue;
            }
            if referenced.contains(key.as_str()) {
                valid.push(key);
            } else {
                dangling.push(key);
            }
        }

        valid.sort_unstable_by(|a, b| b.cmp(a));
        dangling.sort_unstable();

        let keep = valid.iter().take(self.keep).cloned().collect();
        let delete = valid.iter().skip(self.keep).cloned().collect();
        Ok(RetentionPlan {
            keep,
            delete,
            dangling,
        })
    }
}

#[async_trait]
impl RetentionPolicy for RemoteRetention {
    async fn plan(&self, manifest: &Manifest) -> Result<RetentionPlan> {
        self.classify(manifest).await
    }

    async fn apply(&self, manifest: &Manifest) -> Result<RetentionReport> {
        let plan = self.classify(manifest).await?;

        for key in plan.dangling.iter().chain(plan.delete.iter()) {
            self.storage
                .delete(key)
                .await
                .map_err(|e| SessionError::storage(Scope::Remote, e))?;
        }

        tracing::info!(
            kept = plan.keep.len(),
            deleted = plan.delete.len(),
            dangling_deleted = plan.dangling.len(),
            cap = self.keep,
            metric = "warden_retention_remote_completed",
            "remote retention completed"
        );

        Ok(RetentionReport {
            kept: plan.keep,
            deleted: plan.delete,
            dangling_deleted: plan.dangling,
        })
    }
}
