//! Archive codec: directory trees to gzipped tarballs in storage and back.
//!
//! The codec publishes atomically from the reader's point of view: the
//! archive is uploaded under a temp key first, then copied to its final key
//! and the temp key deleted, so a crash mid-upload never leaves a
//! half-written backup where retention or readers would see one. Retention
//! skips the temp suffix.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use walkdir::WalkDir;

use warden_core::keys::temp_key;
use warden_core::StorageRepository;

use crate::error::{Result, SessionError};

/// Builds and extracts archives against a storage repository.
///
/// Destination directory creation is this collaborator's responsibility.
#[async_trait]
pub trait Archiver: Send + Sync + 'static {
    /// Archives the contents of `src_dir` to `dest_key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be read or the upload
    /// fails.
    async fn archive(&self, src_dir: &Path, dest_key: &str) -> Result<()>;

    /// Extracts the archive at `key` into `dest_dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the archive is missing, malformed, or the
    /// extraction fails.
    async fn unarchive(&self, key: &str, dest_dir: &Path) -> Result<()>;
}

/// `tar.gz` codec over a storage repository.
pub struct TarGzArchiver {
    storage: Arc<dyn StorageRepository>,
}

impl TarGzArchiver {
    /// Creates a codec writing to and reading from `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageRepository>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Archiver for TarGzArchiver {
    async fn archive(&self, src_dir: &Path, dest_key: &str) -> Result<()> {
        let src = src_dir.to_path_buf();
        let data = tokio::task::spawn_blocking(move || build_tar_gz(&src))
            .await
            .map_err(|e| SessionError::archive(format!("archive task panicked: {e}")))??;

        // Upload under a temp key, then publish by copy + delete. The temp
        // key is removed on every path, including a failed publish.
        let staging = temp_key(dest_key);
        self.storage
            .put(&staging, data)
            .await
            .map_err(|e| SessionError::archive(format!("upload {staging}: {e}")))?;

        if let Err(e) = self.storage.copy(&staging, dest_key).await {
            let _ = self.storage.delete(&staging).await;
            return Err(SessionError::archive(format!("publish {dest_key}: {e}")));
        }

        self.storage
            .delete(&staging)
            .await
            .map_err(|e| SessionError::archive(format!("cleanup {staging}: {e}")))?;

        Ok(())
    }

    async fn unarchive(&self, key: &str, dest_dir: &Path) -> Result<()> {
        let data = self
            .storage
            .get(key)
            .await
            .map_err(|e| SessionError::archive(format!("download {key}: {e}")))?;

        let dest = dest_dir.to_path_buf();
        tokio::task::spawn_blocking(move || extract_tar_gz(&data, &dest))
            .await
            .map_err(|e| SessionError::archive(format!("unarchive task panicked: {e}")))?
    }
}

/// Builds a gzipped tarball of `src_dir`'s contents (paths relative to it).
fn build_tar_gz(src_dir: &Path) -> Result<Bytes> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in WalkDir::new(src_dir).min_depth(1) {
        let entry =
            entry.map_err(|e| SessionError::archive(format!("walk {}: {e}", src_dir.display())))?;
        let rel = entry
            .path()
            .strip_prefix(src_dir)
            .map_err(|e| SessionError::archive(format!("relativize: {e}")))?;

        if entry.file_type().is_dir() {
            builder
                .append_dir(rel, entry.path())
                .map_err(|e| SessionError::archive(format!("tar dir {}: {e}", rel.display())))?;
        } else if entry.file_type().is_file() {
            builder
                .append_path_with_name(entry.path(), rel)
                .map_err(|e| SessionError::archive(format!("tar file {}: {e}", rel.display())))?;
        }
        // Symlinks and special files are skipped; world saves do not carry them.
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| SessionError::archive(format!("finish tar: {e}")))?;
    let data = encoder
        .finish()
        .map_err(|e| SessionError::archive(format!("finish gzip: {e}")))?;
    Ok(Bytes::from(data))
}

/// Extracts a gzipped tarball into `dest_dir`, creating it if needed.
fn extract_tar_gz(data: &[u8], dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .map_err(|e| SessionError::archive(format!("mkdir {}: {e}", dest_dir.display())))?;

    let decoder = GzDecoder::new(Cursor::new(data));
    let mut archive = tar::Archive::new(decoder);
    archive
        .unpack(dest_dir)
        .map_err(|e| SessionError::archive(format!("unpack into {}: {e}", dest_dir.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::MemoryRepository;

    async fn write_tree(root: &Path) {
        tokio::fs::create_dir_all(root.join("region")).await.unwrap();
        tokio::fs::write(root.join("level.dat"), b"level data")
            .await
            .unwrap();
        tokio::fs::write(root.join("region/r.0.0.mca"), b"chunk data")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_archive_unarchive_roundtrip() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(src.path()).await;

        let storage = Arc::new(MemoryRepository::new());
        let codec = TarGzArchiver::new(storage.clone());

        codec
            .archive(src.path(), "worlds/w.tar.gz")
            .await
            .expect("archive");
        codec
            .unarchive("worlds/w.tar.gz", &dst.path().join("restored"))
            .await
            .expect("unarchive");

        let level = tokio::fs::read(dst.path().join("restored/level.dat"))
            .await
            .expect("level.dat restored");
        assert_eq!(level, b"level data");
        let chunk = tokio::fs::read(dst.path().join("restored/region/r.0.0.mca"))
            .await
            .expect("region restored");
        assert_eq!(chunk, b"chunk data");
    }

    #[tokio::test]
    async fn test_archive_leaves_no_temp_key() {
        let src = tempfile::tempdir().unwrap();
        write_tree(src.path()).await;

        let storage = Arc::new(MemoryRepository::new());
        let codec = TarGzArchiver::new(storage.clone());
        codec
            .archive(src.path(), "worlds/w.tar.gz")
            .await
            .expect("archive");

        let keys = storage.list("").await.unwrap();
        assert_eq!(keys, vec!["worlds/w.tar.gz".to_string()]);
    }

    #[tokio::test]
    async fn test_unarchive_missing_key_fails() {
        let dst = tempfile::tempdir().unwrap();
        let codec = TarGzArchiver::new(Arc::new(MemoryRepository::new()));

        let err = codec
            .unarchive("worlds/absent.tar.gz", &dst.path().join("out"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, SessionError::Archive { .. }));
    }

    #[tokio::test]
    async fn test_unarchive_creates_destination() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(src.path()).await;

        let codec = TarGzArchiver::new(Arc::new(MemoryRepository::new()));
        codec
            .archive(src.path(), "worlds/w.tar.gz")
            .await
            .expect("archive");

        let deep = dst.path().join("a/b/c");
        codec.unarchive("worlds/w.tar.gz", &deep).await.expect("unarchive");
        assert!(deep.join("level.dat").exists());
    }
}
