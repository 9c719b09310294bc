//! World backup collaborators invoked on session exit.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use warden_core::keys::world_backup_key;
use warden_core::StorageRepository;

use crate::archive::Archiver;
use crate::error::{Result, SessionError};
use crate::manifest::Scope;

/// Produces one backup artifact per session exit.
///
/// Returns the storage key of the produced artifact; an empty string means
/// nothing was produced this run, which the orchestrator tolerates.
#[async_trait]
pub trait WorldBackup: Send + Sync + 'static {
    /// Runs the backup and returns the produced artifact key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup could not be produced or stored.
    async fn back_up(&self) -> Result<String>;
}

/// Archives the world directory to a timestamped key in the local scope
/// and mirrors the artifact to the remote scope.
pub struct ArchiveWorldBackup {
    world_dir: PathBuf,
    archiver: Arc<dyn Archiver>,
    local: Arc<dyn StorageRepository>,
    remote: Arc<dyn StorageRepository>,
}

impl ArchiveWorldBackup {
    /// Creates a backup of `world_dir` through `archiver`.
    ///
    /// The archiver is expected to write into the local repository; the
    /// finished artifact is then copied byte-for-byte to the remote one.
    #[must_use]
    pub fn new(
        world_dir: impl Into<PathBuf>,
        archiver: Arc<dyn Archiver>,
        local: Arc<dyn StorageRepository>,
        remote: Arc<dyn StorageRepository>,
    ) -> Self {
        Self {
            world_dir: world_dir.into(),
            archiver,
            local,
            remote,
        }
    }
}

#[async_trait]
impl WorldBackup for ArchiveWorldBackup {
    async fn back_up(&self) -> Result<String> {
        if !self.world_dir.exists() {
            // Nothing to back up; a fresh instance may not have a world yet.
            tracing::warn!(
                world_dir = %self.world_dir.display(),
                "world directory missing, skipping backup"
            );
            return Ok(String::new());
        }

        let key = world_backup_key(Utc::now());
        self.archiver.archive(&self.world_dir, &key).await?;

        let data = self
            .local
            .get(&key)
            .await
            .map_err(|e| SessionError::storage(Scope::Local, e))?;
        self.remote
            .put(&key, data)
            .await
            .map_err(|e| SessionError::storage(Scope::Remote, e))?;

        tracing::info!(key = %key, "world backup produced");
        Ok(key)
    }
}
