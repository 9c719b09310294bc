//! Filesystem-backed storage repository.
//!
//! Maps keys to paths under a root directory. Serves both sides of the
//! replication pair: the local working copy always lives on disk, and a
//! remote store mounted into the filesystem (NFS, FUSE-mounted bucket)
//! uses the same backend.
//!
//! Keys are validated before use: no absolute paths, no traversal, no
//! control characters. A key maps to `<root>/<key>` with `/` as the
//! separator on every platform.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::StorageRepository;

/// Storage repository rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsRepository {
    root: PathBuf,
}

impl FsRepository {
    /// Creates a repository rooted at `root`.
    ///
    /// The root directory itself is created lazily on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory of this repository.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Validates a key for use as a relative path.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for empty keys, absolute paths,
/// backslashes, control characters, or `.`/`..` segments.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidInput("key cannot be empty".into()));
    }

    if key.starts_with('/') {
        return Err(Error::InvalidInput(format!(
            "absolute keys not allowed: {key}"
        )));
    }

    if key.contains('\\') {
        return Err(Error::InvalidInput(format!(
            "backslashes not allowed in keys: {key}"
        )));
    }

    if key.contains('\n') || key.contains('\r') || key.contains('\0') {
        return Err(Error::InvalidInput(format!(
            "control characters not allowed in keys: {key}"
        )));
    }

    for segment in key.split('/') {
        if segment == "." || segment == ".." {
            return Err(Error::InvalidInput(format!(
                "path traversal not allowed: {key}"
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl StorageRepository for FsRepository {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("object not found: {key}")))
            }
            Err(e) => Err(Error::storage_with_source(format!("read {key}"), e)),
        }
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage_with_source(format!("mkdir for {key}"), e))?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| Error::storage_with_source(format!("write {key}"), e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_with_source(format!("delete {key}"), e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // Walk from the deepest existing directory implied by the prefix so
        // a missing directory lists as empty rather than erroring.
        let (dir, _) = split_prefix(prefix);
        let base = if dir.is_empty() {
            self.root.clone()
        } else {
            validate_key(dir)?;
            self.root.join(dir)
        };

        if !base.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut stack = vec![base];
        while let Some(current) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(|e| Error::storage_with_source(format!("list {prefix}"), e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Error::storage_with_source(format!("list {prefix}"), e))?
            {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.root) {
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }
        Ok(keys)
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let src_path = self.resolve(src)?;
        let dst_path = self.resolve(dst)?;
        if let Some(parent) = dst_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage_with_source(format!("mkdir for {dst}"), e))?;
        }
        match tokio::fs::copy(&src_path, &dst_path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("copy source not found: {src}")))
            }
            Err(e) => Err(Error::storage_with_source(format!("copy {src} -> {dst}"), e)),
        }
    }
}

/// Splits a list prefix into its directory part and filename part.
fn split_prefix(prefix: &str) -> (&str, &str) {
    match prefix.rfind('/') {
        Some(idx) => (&prefix[..idx], &prefix[idx + 1..]),
        None => ("", prefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, FsRepository) {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FsRepository::new(dir.path());
        (dir, repo)
    }

    #[tokio::test]
    async fn test_fs_roundtrip() {
        let (_dir, repo) = repo();
        repo.put("nested/dir/file.txt", Bytes::from("payload"))
            .await
            .expect("put");
        let data = repo.get("nested/dir/file.txt").await.expect("get");
        assert_eq!(data, Bytes::from("payload"));
    }

    #[tokio::test]
    async fn test_fs_missing_is_not_found() {
        let (_dir, repo) = repo();
        assert!(repo.get("absent.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_fs_delete_idempotent() {
        let (_dir, repo) = repo();
        repo.put("f", Bytes::from("x")).await.unwrap();
        repo.delete("f").await.expect("delete");
        repo.delete("f").await.expect("second delete");
    }

    #[tokio::test]
    async fn test_fs_list_prefix() {
        let (_dir, repo) = repo();
        repo.put("worlds/a.tar.gz", Bytes::from("a")).await.unwrap();
        repo.put("worlds/b.tar.gz", Bytes::from("b")).await.unwrap();
        repo.put("other/c.tar.gz", Bytes::from("c")).await.unwrap();

        let mut keys = repo.list("worlds/").await.expect("list");
        keys.sort();
        assert_eq!(keys, vec!["worlds/a.tar.gz", "worlds/b.tar.gz"]);
    }

    #[tokio::test]
    async fn test_fs_list_missing_dir_is_empty() {
        let (_dir, repo) = repo();
        assert!(repo.list("nothing/here/").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_fs_copy_missing_source() {
        let (_dir, repo) = repo();
        assert!(repo.copy("a", "b").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_key_validation() {
        assert!(validate_key("worlds/a.tar.gz").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("a\nb").is_err());
    }
}
