//! The shared versioned manifest, replicated local + remote.
//!
//! The manifest is the single source of truth for what the instance is
//! running and which world backups exist. It is stored identically (modulo
//! replication lag) at the same well-known key in both scopes:
//!
//! ```text
//! <local root>/manifest.json
//! <remote root>/manifest.json
//! ```
//!
//! Stored as human-readable UTF-8 JSON for operational debugging. The
//! orchestrator exclusively owns manifest mutation during a run; this
//! module is passthrough serialization only.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::keys::MANIFEST_KEY;
use warden_core::StorageRepository;

use crate::error::{Result, SessionError};

/// Which side of the replication pair an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The host's working copy.
    Local,
    /// The shared remote store.
    Remote,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// One world backup artifact reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct World {
    /// Storage key of the backup archive. Never empty when valid.
    pub uri: String,

    /// When the backup was created. Never the Unix epoch when valid.
    pub created_at: DateTime<Utc>,
}

impl World {
    /// Creates a world entry for the given key and creation time.
    #[must_use]
    pub fn new(uri: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            uri: uri.into(),
            created_at,
        }
    }
}

/// The shared versioned record of instance state and lock ownership.
///
/// The `worlds` sequence is insertion-ordered and treated as monotonically
/// increasing by creation time; the **last** element is authoritative for
/// "latest backup". A manifest with a non-empty `locked_by` must never be
/// used as the base for a new lock acquisition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Dotted version of the orchestrating binary itself.
    pub warden_version: String,

    /// Dotted version tag of the application bundle.
    pub instance_version: String,

    /// Ownership token of the active host, or empty when unlocked.
    ///
    /// Token shape: `hostname + "__" + unix-timestamp + "__" + session-id`.
    #[serde(default)]
    pub locked_by: String,

    /// Ordered world backups; last element is the most recent.
    #[serde(default)]
    pub worlds: Vec<World>,

    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    /// Creates a manifest with the given versions, unlocked and without worlds.
    #[must_use]
    pub fn new(warden_version: impl Into<String>, instance_version: impl Into<String>) -> Self {
        Self {
            warden_version: warden_version.into(),
            instance_version: instance_version.into(),
            locked_by: String::new(),
            worlds: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Returns true when an ownership token is present.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        !self.locked_by.is_empty()
    }

    /// Returns the most recent world backup, if any.
    #[must_use]
    pub fn latest_world(&self) -> Option<&World> {
        self.worlds.last()
    }
}

/// Loads and saves the manifest in both replication scopes.
///
/// A thin wrapper over the two storage repositories; it has no lifecycle
/// of its own beyond serialization.
#[derive(Clone)]
pub struct ManifestStore {
    local: Arc<dyn StorageRepository>,
    remote: Arc<dyn StorageRepository>,
}

impl ManifestStore {
    /// Creates a store over the local and remote repositories.
    #[must_use]
    pub fn new(local: Arc<dyn StorageRepository>, remote: Arc<dyn StorageRepository>) -> Self {
        Self { local, remote }
    }

    /// Returns the repository serving `scope`.
    #[must_use]
    pub fn repository(&self, scope: Scope) -> &Arc<dyn StorageRepository> {
        match scope {
            Scope::Local => &self.local,
            Scope::Remote => &self.remote,
        }
    }

    /// Loads the manifest from `scope`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ManifestMissing`] when no manifest exists yet
    /// - [`SessionError::EmptyManifest`] when the stored value is zero-length
    /// - [`SessionError::Decode`] when the stored bytes are not valid JSON
    /// - [`SessionError::Storage`] when the underlying repository fails
    pub async fn load(&self, scope: Scope) -> Result<Manifest> {
        let data = match self.repository(scope).get(MANIFEST_KEY).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                return Err(SessionError::ManifestMissing { scope });
            }
            Err(e) => return Err(SessionError::storage(scope, e)),
        };

        if data.is_empty() {
            return Err(SessionError::EmptyManifest { scope });
        }

        serde_json::from_slice(&data).map_err(|e| SessionError::Decode {
            scope,
            message: e.to_string(),
        })
    }

    /// Saves `manifest` to `scope`, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the underlying repository fails.
    pub async fn save(&self, scope: Scope, manifest: &Manifest) -> Result<()> {
        let mut stamped = manifest.clone();
        stamped.updated_at = Utc::now();

        let data = serde_json::to_vec_pretty(&stamped).map_err(|e| SessionError::Decode {
            scope,
            message: format!("serialize manifest: {e}"),
        })?;

        self.repository(scope)
            .put(MANIFEST_KEY, Bytes::from(data))
            .await
            .map_err(|e| SessionError::storage(scope, e))
    }
}

/// Execution parameters handed opaquely to the server runner.
///
/// A value object; never mutated by the coordination core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /// Network address the server should announce.
    pub address: String,

    /// IP the server binds.
    pub ip: String,

    /// Port the server binds.
    pub port: u16,

    /// Memory allocation in MiB.
    pub memory_mb: u32,

    /// Path of the launch script.
    pub launch_script: std::path::PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::MemoryRepository;

    fn store() -> ManifestStore {
        ManifestStore::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryRepository::new()),
        )
    }

    fn sample_manifest() -> Manifest {
        let mut m = Manifest::new("0.3.0", "1.20.4");
        m.worlds.push(World::new(
            "worlds/20240301T120000Z.tar.gz",
            Utc::now(),
        ));
        m
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = store();
        let manifest = sample_manifest();

        store.save(Scope::Local, &manifest).await.expect("save");
        let loaded = store.load(Scope::Local).await.expect("load");

        assert_eq!(loaded.warden_version, manifest.warden_version);
        assert_eq!(loaded.instance_version, manifest.instance_version);
        assert_eq!(loaded.locked_by, manifest.locked_by);
        assert_eq!(loaded.worlds, manifest.worlds);
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let store = store();
        let manifest = sample_manifest();

        store.save(Scope::Remote, &manifest).await.expect("save");

        assert!(matches!(
            store.load(Scope::Local).await,
            Err(SessionError::ManifestMissing {
                scope: Scope::Local
            })
        ));
        assert!(store.load(Scope::Remote).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_manifest_is_distinct() {
        let store = store();
        assert!(matches!(
            store.load(Scope::Remote).await,
            Err(SessionError::ManifestMissing {
                scope: Scope::Remote
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_manifest_is_distinct() {
        let local = Arc::new(MemoryRepository::new());
        local.put(MANIFEST_KEY, Bytes::new()).await.unwrap();
        let store = ManifestStore::new(local, Arc::new(MemoryRepository::new()));

        assert!(matches!(
            store.load(Scope::Local).await,
            Err(SessionError::EmptyManifest {
                scope: Scope::Local
            })
        ));
    }

    #[tokio::test]
    async fn test_garbage_manifest_is_decode_error() {
        let local = Arc::new(MemoryRepository::new());
        local
            .put(MANIFEST_KEY, Bytes::from("not json at all"))
            .await
            .unwrap();
        let store = ManifestStore::new(local, Arc::new(MemoryRepository::new()));

        assert!(matches!(
            store.load(Scope::Local).await,
            Err(SessionError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_stamps_updated_at() {
        let store = store();
        let mut manifest = sample_manifest();
        manifest.updated_at = Utc::now() - chrono::Duration::days(30);

        store.save(Scope::Local, &manifest).await.expect("save");
        let loaded = store.load(Scope::Local).await.expect("load");
        assert!(loaded.updated_at > manifest.updated_at);
    }

    #[test]
    fn test_latest_world_is_last() {
        let mut m = Manifest::new("0.3.0", "1.20.4");
        assert!(m.latest_world().is_none());

        m.worlds.push(World::new("worlds/a.tar.gz", Utc::now()));
        m.worlds.push(World::new("worlds/b.tar.gz", Utc::now()));
        assert_eq!(m.latest_world().map(|w| w.uri.as_str()), Some("worlds/b.tar.gz"));
    }

    #[test]
    fn test_lock_state() {
        let mut m = Manifest::new("0.3.0", "1.20.4");
        assert!(!m.is_locked());
        m.locked_by = "alpha__1709290000__01HVX".into();
        assert!(m.is_locked());
    }
}
