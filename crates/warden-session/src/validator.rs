//! Consistency checks between the local and remote manifests.
//!
//! Pure, side-effect-free classification. The checks never remediate:
//! they return a [`ValidationError`] describing the drift or conflict, and
//! the orchestrator decides what to do about it. Two of the variants,
//! [`ValidationError::OutdatedInstance`] and
//! [`ValidationError::OutdatedWorld`], are staleness signals that trigger a
//! resync rather than failures; the conflict variants are always fatal to
//! the current operation.

use thiserror::Error;

use crate::manifest::{Manifest, Scope, World};

/// Result of a consistency check.
pub type ValidationResult = std::result::Result<(), ValidationError>;

/// Drift classifications and input-contract violations.
///
/// A closed enum so callers can match exhaustively.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A manifest carries a blank or whitespace-only instance version.
    #[error("instance version is empty ({scope} scope)")]
    EmptyInstanceVersion {
        /// Which manifest carried the blank version.
        scope: Scope,
    },

    /// Local and remote instance versions differ.
    ///
    /// Staleness signal: the local bundle must be resynchronized.
    #[error("local instance {local:?} does not match remote {remote:?}")]
    OutdatedInstance {
        /// Version recorded locally.
        local: String,
        /// Version recorded remotely.
        remote: String,
    },

    /// Remote has world backups but local has none.
    #[error("remote has {remote_count} world backups, local has none")]
    NoLocalWorlds {
        /// Number of worlds recorded remotely.
        remote_count: usize,
    },

    /// A world entry carries an empty URI.
    #[error("world entry {index} has an empty uri ({scope} scope)")]
    EmptyWorldUri {
        /// Which manifest carried the invalid entry.
        scope: Scope,
        /// Position of the invalid entry.
        index: usize,
    },

    /// A world entry carries a zero-value creation timestamp.
    #[error("world entry {index} has a zero timestamp ({scope} scope)")]
    ZeroWorldTimestamp {
        /// Which manifest carried the invalid entry.
        scope: Scope,
        /// Position of the invalid entry.
        index: usize,
    },

    /// The latest local and remote world backups differ.
    ///
    /// Staleness signal: the local world must be resynchronized.
    #[error("local latest world {local:?} does not match remote {remote:?}")]
    OutdatedWorld {
        /// URI of the latest local world, if any.
        local: Option<String>,
        /// URI of the latest remote world.
        remote: String,
    },

    /// A manifest carries an ownership token.
    ///
    /// Any existing lock, including the caller's own leftover from a
    /// previous run, is a conflict the caller must resolve; it is never
    /// silently granted.
    #[error("locked by {holder:?} ({scope} scope)")]
    LockConflict {
        /// Which manifest carried the token.
        scope: Scope,
        /// The token found.
        holder: String,
    },
}

impl ValidationError {
    /// Returns true for staleness signals the orchestrator resolves by
    /// resynchronizing, as opposed to fatal conflicts.
    #[must_use]
    pub fn is_staleness(&self) -> bool {
        matches!(self, Self::OutdatedInstance { .. } | Self::OutdatedWorld { .. })
    }
}

/// Checks that local and remote agree on the instance bundle version.
///
/// The bundle is versioned by a server-provided tag, not semantic order, so
/// inequality is exact string inequality.
///
/// # Errors
///
/// [`ValidationError::EmptyInstanceVersion`] when either side is blank or
/// whitespace-only; [`ValidationError::OutdatedInstance`] when they differ.
pub fn check_instance(local: &Manifest, remote: &Manifest) -> ValidationResult {
    if local.instance_version.trim().is_empty() {
        return Err(ValidationError::EmptyInstanceVersion { scope: Scope::Local });
    }
    if remote.instance_version.trim().is_empty() {
        return Err(ValidationError::EmptyInstanceVersion {
            scope: Scope::Remote,
        });
    }

    if local.instance_version != remote.instance_version {
        return Err(ValidationError::OutdatedInstance {
            local: local.instance_version.clone(),
            remote: remote.instance_version.clone(),
        });
    }

    Ok(())
}

/// Checks that the local replica holds the latest remote world backup.
///
/// Succeeds unconditionally when remote has no worlds (a fresh instance has
/// no backups yet). Only the **last** entries are compared; older entries
/// may differ, tolerating retention-driven pruning skew between replicas.
///
/// # Errors
///
/// [`ValidationError::NoLocalWorlds`] when local is empty and remote is
/// not; [`ValidationError::EmptyWorldUri`] /
/// [`ValidationError::ZeroWorldTimestamp`] for invalid entries on either
/// side; [`ValidationError::OutdatedWorld`] when the last entries differ.
pub fn check_world(local: &Manifest, remote: &Manifest) -> ValidationResult {
    let Some(remote_last) = remote.worlds.last() else {
        return Ok(());
    };

    if local.worlds.is_empty() {
        return Err(ValidationError::NoLocalWorlds {
            remote_count: remote.worlds.len(),
        });
    }

    check_world_entries(Scope::Local, &local.worlds)?;
    check_world_entries(Scope::Remote, &remote.worlds)?;

    let local_last = local.worlds.last();
    if local_last != Some(remote_last) {
        return Err(ValidationError::OutdatedWorld {
            local: local_last.map(|w| w.uri.clone()),
            remote: remote_last.uri.clone(),
        });
    }

    Ok(())
}

fn check_world_entries(scope: Scope, worlds: &[World]) -> ValidationResult {
    for (index, world) in worlds.iter().enumerate() {
        if world.uri.trim().is_empty() {
            return Err(ValidationError::EmptyWorldUri { scope, index });
        }
        if world.created_at.timestamp() == 0 {
            return Err(ValidationError::ZeroWorldTimestamp { scope, index });
        }
    }
    Ok(())
}

/// Checks that neither manifest carries an ownership token.
///
/// # Errors
///
/// [`ValidationError::LockConflict`] when either side is locked; the local
/// side is reported first.
pub fn check_lock(local: &Manifest, remote: &Manifest) -> ValidationResult {
    if local.is_locked() {
        return Err(ValidationError::LockConflict {
            scope: Scope::Local,
            holder: local.locked_by.clone(),
        });
    }
    if remote.is_locked() {
        return Err(ValidationError::LockConflict {
            scope: Scope::Remote,
            holder: remote.locked_by.clone(),
        });
    }
    Ok(())
}
