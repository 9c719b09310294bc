//! Storage repository abstraction for instance state (local disk or remote store).
//!
//! This module defines the key/value contract every backend must implement.
//! The contract is intentionally minimal: plain get/put/delete/list/copy over
//! a byte-addressed namespace, with **no conditional writes**. The
//! coordination protocol built on top assumes an eventually-consistent
//! substrate without compare-and-swap; a backend must not be assumed to
//! offer stronger ordering than last-writer-wins.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// Storage repository trait over a byte-addressed key/value namespace.
///
/// Implemented by the local filesystem backend and by remote object stores.
/// All operations are blocking, synchronous calls from the caller's point of
/// view; cancellation is the caller dropping the future.
#[async_trait]
pub trait StorageRepository: Send + Sync + 'static {
    /// Reads the entire value stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no value exists at `key`.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Writes `data` at `key`, unconditionally replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Deletes the value at `key`.
    ///
    /// Idempotent: deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists all keys starting with `prefix`.
    ///
    /// Returns an empty vec when nothing matches.
    ///
    /// **Ordering**: results come back in arbitrary order that may vary
    /// between backends and invocations. Callers requiring deterministic
    /// order must sort.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Copies the value at `src` to `dst`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `src` does not exist.
    async fn copy(&self, src: &str, dst: &str) -> Result<()>;
}

/// In-memory storage repository for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryRepository {
    /// Creates a new empty memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_objects()?.len())
    }

    /// Returns true if no keys are stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_objects()?.is_empty())
    }

    fn read_objects(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Bytes>>> {
        self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }

    fn write_objects(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Bytes>>> {
        self.objects.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }
}

#[async_trait]
impl StorageRepository for MemoryRepository {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.read_objects()?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("object not found: {key}")))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.write_objects()?.insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.write_objects()?.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .read_objects()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let mut objects = self.write_objects()?;
        let data = objects
            .get(src)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("copy source not found: {src}")))?;
        objects.insert(dst.to_string(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let repo = MemoryRepository::new();
        let data = Bytes::from("hello world");

        repo.put("test/file.txt", data.clone())
            .await
            .expect("put should succeed");

        let retrieved = repo.get("test/file.txt").await.expect("get should succeed");
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = MemoryRepository::new();
        let err = repo.get("absent").await.expect_err("should fail");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let repo = MemoryRepository::new();
        repo.put("k", Bytes::from("v1")).await.unwrap();
        repo.put("k", Bytes::from("v2")).await.unwrap();
        assert_eq!(repo.get("k").await.unwrap(), Bytes::from("v2"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let repo = MemoryRepository::new();
        repo.put("del.txt", Bytes::from("data")).await.unwrap();

        repo.delete("del.txt").await.expect("first delete");
        repo.delete("del.txt").await.expect("second delete is not an error");
        assert!(repo.get("del.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let repo = MemoryRepository::new();
        repo.put("a/1.txt", Bytes::from("a1")).await.unwrap();
        repo.put("a/2.txt", Bytes::from("a2")).await.unwrap();
        repo.put("b/1.txt", Bytes::from("b1")).await.unwrap();

        let mut list_a = repo.list("a/").await.expect("list a");
        list_a.sort();
        assert_eq!(list_a, vec!["a/1.txt".to_string(), "a/2.txt".to_string()]);

        let list_b = repo.list("b/").await.expect("list b");
        assert_eq!(list_b, vec!["b/1.txt".to_string()]);

        assert!(repo.list("c/").await.expect("list c").is_empty());
    }

    #[tokio::test]
    async fn test_copy() {
        let repo = MemoryRepository::new();
        repo.put("src", Bytes::from("payload")).await.unwrap();

        repo.copy("src", "dst").await.expect("copy should succeed");
        assert_eq!(repo.get("dst").await.unwrap(), Bytes::from("payload"));
        // Source remains.
        assert_eq!(repo.get("src").await.unwrap(), Bytes::from("payload"));
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let repo = MemoryRepository::new();
        let err = repo.copy("absent", "dst").await.expect_err("should fail");
        assert!(err.is_not_found());
        assert!(repo.get("dst").await.is_err());
    }
}
