//! Streaming push/pull of directory trees with progress events.
//!
//! A thin layer over the archive codec that adds multi-directory pushes,
//! conflict handling on pull, and per-step progress events for a UI.

use std::path::Path;
use std::sync::Arc;

use warden_core::{EventSink, StorageRepository};

use crate::archive::Archiver;
use crate::error::{Result, SessionError};
use crate::manifest::Scope;

/// What to do when a pull destination already holds content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Extract over whatever exists.
    #[default]
    Overwrite,
    /// Leave the destination untouched and return success.
    Skip,
    /// Fail the pull.
    Fail,
}

/// Directory transfer over an archiver and a storage repository.
pub struct Transfer {
    archiver: Arc<dyn Archiver>,
    storage: Arc<dyn StorageRepository>,
    events: EventSink,
}

impl Transfer {
    /// Creates a transfer layer over `archiver` and `storage`.
    #[must_use]
    pub fn new(
        archiver: Arc<dyn Archiver>,
        storage: Arc<dyn StorageRepository>,
        events: EventSink,
    ) -> Self {
        Self {
            archiver,
            storage,
            events,
        }
    }

    /// Archives each directory in `dirs` to `<dest_prefix><dir name>.tar.gz`.
    ///
    /// Returns the total bytes written across all produced archives.
    ///
    /// # Errors
    ///
    /// Returns an error when a directory cannot be archived or its name is
    /// not expressible as a key.
    pub async fn push<P: AsRef<Path>>(&self, dirs: &[P], dest_prefix: &str) -> Result<u64> {
        self.events.started("push");
        let mut total: u64 = 0;

        for dir in dirs {
            let dir = dir.as_ref();
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    SessionError::archive(format!("directory has no name: {}", dir.display()))
                })?;
            let key = format!("{dest_prefix}{name}.tar.gz");

            self.events.progress("push", &key);
            self.archiver.archive(dir, &key).await?;

            let data = self
                .storage
                .get(&key)
                .await
                .map_err(|e| SessionError::storage(Scope::Remote, e))?;
            total += data.len() as u64;
        }

        self.events.finished("push");
        Ok(total)
    }

    /// Extracts the archive at `key` into `dest_dir`.
    ///
    /// An existing non-empty destination is resolved by `policy`.
    ///
    /// # Errors
    ///
    /// Returns an error when the archive is missing or malformed, or when
    /// `policy` is [`ConflictPolicy::Fail`] and the destination holds
    /// content.
    pub async fn pull(&self, key: &str, dest_dir: &Path, policy: ConflictPolicy) -> Result<()> {
        self.events.started("pull");

        if dir_has_content(dest_dir).await {
            match policy {
                ConflictPolicy::Overwrite => {}
                ConflictPolicy::Skip => {
                    tracing::debug!(dest = %dest_dir.display(), "pull skipped, destination not empty");
                    self.events.finished("pull");
                    return Ok(());
                }
                ConflictPolicy::Fail => {
                    return Err(SessionError::archive(format!(
                        "destination not empty: {}",
                        dest_dir.display()
                    )));
                }
            }
        }

        self.events.progress("pull", key);
        self.archiver.unarchive(key, dest_dir).await?;
        self.events.finished("pull");
        Ok(())
    }
}

async fn dir_has_content(dir: &Path) -> bool {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::TarGzArchiver;
    use warden_core::{Event, MemoryRepository};

    async fn seeded_dir(name: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join(name);
        tokio::fs::create_dir_all(&sub).await.unwrap();
        tokio::fs::write(sub.join("file.txt"), b"payload").await.unwrap();
        dir
    }

    fn transfer(storage: Arc<MemoryRepository>) -> (Transfer, tokio::sync::mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = EventSink::channel();
        let archiver = Arc::new(TarGzArchiver::new(storage.clone()));
        (Transfer::new(archiver, storage, events), rx)
    }

    #[tokio::test]
    async fn test_push_returns_bytes_written() {
        let holder = seeded_dir("world").await;
        let storage = Arc::new(MemoryRepository::new());
        let (transfer, _rx) = transfer(storage.clone());

        let bytes = transfer
            .push(&[&holder.path().join("world")], "sync/")
            .await
            .expect("push");
        assert!(bytes > 0);
        assert!(storage.get("sync/world.tar.gz").await.is_ok());
    }

    #[tokio::test]
    async fn test_pull_into_empty_dir() {
        let holder = seeded_dir("world").await;
        let storage = Arc::new(MemoryRepository::new());
        let (transfer, _rx) = transfer(storage.clone());
        transfer
            .push(&[&holder.path().join("world")], "sync/")
            .await
            .unwrap();

        let dest = tempfile::tempdir().unwrap();
        let out = dest.path().join("restored");
        transfer
            .pull("sync/world.tar.gz", &out, ConflictPolicy::Fail)
            .await
            .expect("pull");
        assert!(out.join("file.txt").exists());
    }

    #[tokio::test]
    async fn test_pull_conflict_policies() {
        let holder = seeded_dir("world").await;
        let storage = Arc::new(MemoryRepository::new());
        let (transfer, _rx) = transfer(storage.clone());
        transfer
            .push(&[&holder.path().join("world")], "sync/")
            .await
            .unwrap();

        let dest = tempfile::tempdir().unwrap();
        tokio::fs::write(dest.path().join("existing.txt"), b"keep me")
            .await
            .unwrap();

        // Fail: error, destination untouched.
        let err = transfer
            .pull("sync/world.tar.gz", dest.path(), ConflictPolicy::Fail)
            .await
            .expect_err("should fail");
        assert!(matches!(err, SessionError::Archive { .. }));
        assert!(!dest.path().join("file.txt").exists());

        // Skip: success, destination untouched.
        transfer
            .pull("sync/world.tar.gz", dest.path(), ConflictPolicy::Skip)
            .await
            .expect("skip");
        assert!(!dest.path().join("file.txt").exists());

        // Overwrite: extracts alongside.
        transfer
            .pull("sync/world.tar.gz", dest.path(), ConflictPolicy::Overwrite)
            .await
            .expect("overwrite");
        assert!(dest.path().join("file.txt").exists());
        assert!(dest.path().join("existing.txt").exists());
    }

    #[tokio::test]
    async fn test_push_emits_events() {
        let holder = seeded_dir("world").await;
        let storage = Arc::new(MemoryRepository::new());
        let (transfer, mut rx) = transfer(storage);

        transfer
            .push(&[&holder.path().join("world")], "sync/")
            .await
            .unwrap();

        assert!(matches!(rx.recv().await, Some(Event::Started { .. })));
        assert!(matches!(rx.recv().await, Some(Event::Progress { .. })));
        assert!(matches!(rx.recv().await, Some(Event::Finished { .. })));
    }
}
