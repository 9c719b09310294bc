//! The session state machine: Prepare → Run → Exit.
//!
//! One orchestrator instance drives one logical session, strictly
//! sequentially. Cross-host mutual exclusion is mediated entirely through
//! the shared storage substrate; the only in-process state carried across
//! phases is the ownership token of a successfully acquired lock, held as
//! an explicit field on the instance (never package-level state, so
//! concurrent orchestrators in tests do not interfere).
//!
//! # Consistency model
//!
//! The substrate offers no compare-and-swap, so lock acquisition is a
//! check-then-act protocol: re-check both manifests unlocked immediately
//! before writing, save local first, then remote. Two hosts racing can
//! both pass the pre-write check; the last writer wins on the remote copy
//! and the loser detects the conflict on its next cycle (lock check on
//! Prepare/Run, or ownership mismatch on Exit). This window is deliberate
//! and must not be narrowed by caching manifests across phase boundaries:
//! every phase re-fetches what it reads.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;
use ulid::Ulid;

use warden_core::keys::{INSTANCE_BUNDLE_KEY, PRE_UPDATE_KEY};
use warden_core::observability::session_span;
use warden_core::EventSink;

use crate::archive::Archiver;
use crate::backup::WorldBackup;
use crate::error::{Result, SessionError};
use crate::manifest::{Manifest, ManifestStore, Scope, Server, World};
use crate::retention::RetentionPolicy;
use crate::runner::ServerRunner;
use crate::validator::{check_instance, check_lock, check_world, ValidationError};
use crate::version::is_older;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has happened yet.
    Idle,
    /// The local replica mirrors remote instance/world state.
    Prepared,
    /// The lock is held and the server runs (or ran and failed).
    Running,
    /// The session finished; backups taken, lock released.
    Exited,
}

/// Host identity and working directories for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hostname used in lock tokens and log spans.
    pub host: String,
    /// Version of this orchestrating binary (self-update gate input).
    pub warden_version: String,
    /// Directory the application bundle is extracted into.
    pub instance_dir: PathBuf,
    /// Directory the active world lives in.
    pub world_dir: PathBuf,
}

/// Drives one session of the game-server instance.
pub struct Orchestrator {
    config: SessionConfig,
    store: ManifestStore,
    /// Codec over the local repository (pre-update safety copies, backups).
    local_archiver: Arc<dyn Archiver>,
    /// Codec over the remote repository (bundle and world downloads).
    remote_archiver: Arc<dyn Archiver>,
    runner: Arc<dyn ServerRunner>,
    backups: Vec<Arc<dyn WorldBackup>>,
    retention: Vec<Arc<dyn RetentionPolicy>>,
    events: EventSink,
    phase: Phase,
    /// Ownership token of the lock this run acquired, if any.
    lock_token: Option<String>,
}

impl Orchestrator {
    /// Creates an orchestrator with no backups or retention registered.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        store: ManifestStore,
        local_archiver: Arc<dyn Archiver>,
        remote_archiver: Arc<dyn Archiver>,
        runner: Arc<dyn ServerRunner>,
    ) -> Self {
        Self {
            config,
            store,
            local_archiver,
            remote_archiver,
            runner,
            backups: Vec::new(),
            retention: Vec::new(),
            events: EventSink::disabled(),
            phase: Phase::Idle,
            lock_token: None,
        }
    }

    /// Registers a backup collaborator, invoked in registration order on exit.
    #[must_use]
    pub fn with_backup(mut self, backup: Arc<dyn WorldBackup>) -> Self {
        self.backups.push(backup);
        self
    }

    /// Registers a retention policy, applied in registration order on exit.
    #[must_use]
    pub fn with_retention(mut self, policy: Arc<dyn RetentionPolicy>) -> Self {
        self.retention.push(policy);
        self
    }

    /// Attaches a progress event sink.
    #[must_use]
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the held lock token, if a lock was acquired.
    #[must_use]
    pub fn lock_token(&self) -> Option<&str> {
        self.lock_token.as_deref()
    }

    /// Establishes a consistent, unlocked local replica of the remote state.
    ///
    /// Fetches the remote manifest; seeds the local replica when it does
    /// not exist yet; aborts on any lock conflict (Prepare takes no lock
    /// itself); resynchronizes the instance bundle and the latest world
    /// when the validator classifies them stale.
    ///
    /// # Errors
    ///
    /// Any validation conflict or collaborator failure aborts the phase.
    pub async fn prepare(&mut self) -> Result<()> {
        if self.phase != Phase::Idle {
            return Err(SessionError::Phase {
                message: format!("prepare called in phase {:?}", self.phase),
            });
        }

        let span = session_span("prepare", &self.config.host);
        self.prepare_inner().instrument(span).await
    }

    async fn prepare_inner(&mut self) -> Result<()> {
        self.events.started("prepare");

        let remote = self.store.load(Scope::Remote).await?;

        if is_older(&self.config.warden_version, &remote.warden_version) {
            tracing::warn!(
                running = %self.config.warden_version,
                required = %remote.warden_version,
                "warden binary is older than the manifest requires; update it out-of-band"
            );
            self.events.progress(
                "prepare",
                format!(
                    "warden {} is outdated, manifest requires {}",
                    self.config.warden_version, remote.warden_version
                ),
            );
        }

        let mut local = match self.store.load(Scope::Local).await {
            Ok(manifest) => manifest,
            Err(SessionError::ManifestMissing { .. }) => self.seed_local(&remote).await?,
            Err(e) => return Err(e),
        };

        check_lock(&local, &remote)?;

        match check_instance(&local, &remote) {
            Ok(()) => {}
            Err(ValidationError::OutdatedInstance { .. }) => {
                self.sync_instance(&remote).await?;
                local.instance_version.clone_from(&remote.instance_version);
                self.store.save(Scope::Local, &local).await?;
                check_instance(&local, &remote)?;
            }
            Err(e) => return Err(e.into()),
        }

        match check_world(&local, &remote) {
            Ok(()) => {}
            Err(ValidationError::OutdatedWorld { .. }) => {
                self.sync_world(&remote).await?;
                local.worlds.clone_from(&remote.worlds);
                self.store.save(Scope::Local, &local).await?;
                check_world(&local, &remote)?;
            }
            Err(e) => return Err(e.into()),
        }

        self.phase = Phase::Prepared;
        self.events.finished("prepare");
        tracing::info!(
            instance_version = %local.instance_version,
            worlds = local.worlds.len(),
            metric = "warden_prepare_completed",
            "prepare completed"
        );
        Ok(())
    }

    /// Acquires the coordination lock and hands off to the server runner.
    ///
    /// Re-fetches both manifests (never trusts Prepare-era reads), defends
    /// against re-entrant runs, executes the lock protocol, then blocks on
    /// the runner for the server's lifetime. Runner failure propagates
    /// unchanged; the lock stays held until [`Orchestrator::exit`].
    ///
    /// # Errors
    ///
    /// [`ValidationError::LockConflict`] when any lock exists;
    /// [`SessionError::LockRollback`] when the remote lock save failed and
    /// the local lock was rolled back; runner errors verbatim.
    pub async fn run(&mut self, server: &Server) -> Result<()> {
        if self.phase != Phase::Prepared {
            return Err(SessionError::Phase {
                message: format!("run called in phase {:?}", self.phase),
            });
        }

        let span = session_span("run", &self.config.host);
        self.run_inner(server).instrument(span).await
    }

    async fn run_inner(&mut self, server: &Server) -> Result<()> {
        self.events.started("run");

        let remote = self.store.load(Scope::Remote).await?;
        let local = self.store.load(Scope::Local).await?;

        // Re-entrant defense: a locked local replica means a previous run
        // on this host never released.
        if local.is_locked() {
            return Err(ValidationError::LockConflict {
                scope: Scope::Local,
                holder: local.locked_by.clone(),
            }
            .into());
        }

        // Closes the window between Prepare and Run: another host may have
        // locked in between.
        check_lock(&local, &remote)?;

        let token = self.acquire_lock(local, remote).await?;
        tracing::info!(token = %token, metric = "warden_lock_acquired", "lock acquired");
        self.lock_token = Some(token);
        self.phase = Phase::Running;

        self.runner.run(server).await?;
        self.events.finished("run");
        Ok(())
    }

    /// Backs up the session, updates the manifest, prunes, and unlocks.
    ///
    /// With no lock token held this is a no-op success: Exit must not
    /// attempt to release a lock it never took.
    ///
    /// # Errors
    ///
    /// [`SessionError::LockOwnership`] when the stored token belongs to a
    /// different run; collaborator failures verbatim. A remote unlock
    /// failure is surfaced after the local unlock has already taken
    /// effect.
    pub async fn exit(&mut self) -> Result<()> {
        let Some(token) = self.lock_token.clone() else {
            tracing::info!("exit without a held lock is a no-op");
            self.phase = Phase::Exited;
            return Ok(());
        };

        let span = session_span("exit", &self.config.host);
        self.exit_inner(&token).instrument(span).await
    }

    async fn exit_inner(&mut self, token: &str) -> Result<()> {
        self.events.started("exit");

        // Run every registered backup; the last non-empty key becomes the
        // new world entry.
        let mut produced = String::new();
        for backup in &self.backups {
            let key = backup.back_up().await?;
            if !key.is_empty() {
                produced = key;
            }
        }

        let mut local = self.store.load(Scope::Local).await?;
        if produced.is_empty() {
            tracing::warn!("no backup artifact produced this session");
        } else {
            local.worlds.push(World::new(produced.clone(), Utc::now()));
        }
        self.store.save(Scope::Local, &local).await?;
        self.store.save(Scope::Remote, &local).await?;

        for policy in &self.retention {
            policy.apply(&local).await?;
        }

        let result = self.unlock(token).await;
        if result.is_ok() {
            self.events.finished("exit");
            tracing::info!(
                backup = %produced,
                metric = "warden_exit_completed",
                "exit completed"
            );
        }
        result
    }

    // =========================================================================
    // Lock protocol
    // =========================================================================

    /// Writes the ownership token to both scopes, local first.
    ///
    /// A remote failure rolls the local lock back so no orphaned local
    /// lock survives without a matching remote lock; a rollback failure is
    /// reported combined with the original cause.
    async fn acquire_lock(&self, mut local: Manifest, mut remote: Manifest) -> Result<String> {
        let token = format!(
            "{}__{}__{}",
            self.config.host,
            Utc::now().timestamp(),
            Ulid::new()
        );

        local.locked_by.clone_from(&token);
        remote.locked_by.clone_from(&token);

        self.store.save(Scope::Local, &local).await?;

        match self.store.save(Scope::Remote, &remote).await {
            Ok(()) => Ok(token),
            Err(cause) => {
                local.locked_by.clear();
                let rollback = match self.store.save(Scope::Local, &local).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::error!(error = %e, "local lock rollback failed");
                        Some(Box::new(e))
                    }
                };
                Err(SessionError::LockRollback {
                    cause: Box::new(cause),
                    rollback,
                })
            }
        }
    }

    /// Clears the token from both scopes after proving ownership.
    async fn unlock(&mut self, token: &str) -> Result<()> {
        let mut local = self.store.load(Scope::Local).await?;

        if !local.is_locked() {
            // Already unlocked (operator intervention, or a duplicate exit):
            // idempotent success, not an error.
            tracing::info!("local manifest already unlocked");
            self.lock_token = None;
            self.phase = Phase::Exited;
            return Ok(());
        }

        if local.locked_by != token {
            return Err(SessionError::LockOwnership {
                stored: local.locked_by.clone(),
                held: token.to_string(),
            });
        }

        local.locked_by.clear();
        self.store.save(Scope::Local, &local).await?;
        self.lock_token = None;
        self.phase = Phase::Exited;

        // Remote release comes last; a failure here leaves an asymmetric
        // unlock state the next cycle diagnoses via its lock check. The
        // error is surfaced, the local unlock stands.
        self.store.save(Scope::Remote, &local).await?;
        tracing::info!(metric = "warden_lock_released", "lock released");
        Ok(())
    }

    // =========================================================================
    // Sync sub-routines
    // =========================================================================

    /// Seeds the local replica from remote state on first run.
    async fn seed_local(&self, remote: &Manifest) -> Result<Manifest> {
        tracing::info!("no local manifest, seeding replica from remote");
        self.events.progress("prepare", "seeding local replica");

        self.sync_instance(remote).await?;
        if remote.latest_world().is_some() {
            self.pull_latest_world(remote).await?;
        }

        let mut seeded = Manifest::new(
            self.config.warden_version.clone(),
            remote.instance_version.clone(),
        );
        seeded.worlds.clone_from(&remote.worlds);
        self.store.save(Scope::Local, &seeded).await?;
        Ok(seeded)
    }

    /// Downloads and extracts the application bundle.
    async fn sync_instance(&self, remote: &Manifest) -> Result<()> {
        tracing::info!(
            instance_version = %remote.instance_version,
            "syncing instance bundle"
        );
        self.events.progress("prepare", "downloading instance bundle");
        self.remote_archiver
            .unarchive(INSTANCE_BUNDLE_KEY, &self.config.instance_dir)
            .await
    }

    /// Replaces the local world with the latest remote backup, keeping a
    /// pre-update safety copy of what is about to be overwritten.
    async fn sync_world(&self, remote: &Manifest) -> Result<()> {
        if self.config.world_dir.exists() {
            tracing::info!(key = PRE_UPDATE_KEY, "archiving current world before resync");
            self.local_archiver
                .archive(&self.config.world_dir, PRE_UPDATE_KEY)
                .await?;
        } else {
            // Missing source is not an error; there is nothing to preserve.
            tracing::debug!(
                world_dir = %self.config.world_dir.display(),
                "no current world to archive before resync"
            );
        }

        self.pull_latest_world(remote).await
    }

    async fn pull_latest_world(&self, remote: &Manifest) -> Result<()> {
        let Some(world) = remote.latest_world() else {
            return Ok(());
        };
        tracing::info!(uri = %world.uri, "downloading latest world");
        self.events.progress("prepare", format!("downloading {}", world.uri));
        self.remote_archiver
            .unarchive(&world.uri, &self.config.world_dir)
            .await
    }
}

/// Detects the hostname for lock tokens.
///
/// Shells out to `hostname`; falls back to `"unknown-host"` when the
/// command is unavailable or prints nothing.
pub async fn detect_hostname() -> String {
    match tokio::process::Command::new("hostname").output().await {
        Ok(output) if output.status.success() => {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if name.is_empty() {
                "unknown-host".to_string()
            } else {
                name
            }
        }
        _ => "unknown-host".to_string(),
    }
}
