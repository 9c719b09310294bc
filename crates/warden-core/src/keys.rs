//! Well-known storage keys and key builders.
//!
//! Both replication scopes share one layout:
//!
//! ```text
//! <scope root>/
//! ├── manifest.json            # the shared versioned manifest
//! ├── instance.tar.gz          # the application bundle
//! └── worlds/
//!     ├── 20240301T120000Z.tar.gz
//!     ├── 20240302T120000Z.tar.gz
//!     └── pre-update/          # safety copies taken before a world resync
//! ```
//!
//! Backup keys embed a UTC timestamp so lexicographic ordering equals
//! chronological ordering; retention relies on this.

use chrono::{DateTime, Utc};

/// Key of the shared versioned manifest in both scopes.
pub const MANIFEST_KEY: &str = "manifest.json";

/// Key of the application bundle archive.
pub const INSTANCE_BUNDLE_KEY: &str = "instance.tar.gz";

/// Prefix under which world backup archives are stored.
pub const WORLD_BACKUP_PREFIX: &str = "worlds/";

/// Prefix for safety copies taken before a world resync overwrites local state.
pub const PRE_UPDATE_PREFIX: &str = "worlds/pre-update/";

/// Safety-copy key written before a world resync.
///
/// A single fixed key: each resync overwrites the previous copy, so the
/// safety net never grows. Retention skips the pre-update prefix entirely.
pub const PRE_UPDATE_KEY: &str = "worlds/pre-update/previous.tar.gz";

/// Suffix of completed backup archives.
pub const BACKUP_SUFFIX: &str = ".tar.gz";

/// Suffix of in-progress uploads. Never counted by retention.
pub const TEMP_SUFFIX: &str = ".part";

/// Timestamp format used in backup keys (second precision, sortable).
const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Builds the key of a world backup created at `created_at`.
#[must_use]
pub fn world_backup_key(created_at: DateTime<Utc>) -> String {
    format!(
        "{WORLD_BACKUP_PREFIX}{}{BACKUP_SUFFIX}",
        created_at.format(KEY_TIMESTAMP_FORMAT)
    )
}

/// Returns true for keys that name a completed backup archive.
///
/// Excludes in-progress uploads and anything under the pre-update prefix.
#[must_use]
pub fn is_backup_key(key: &str) -> bool {
    key.starts_with(WORLD_BACKUP_PREFIX)
        && key.ends_with(BACKUP_SUFFIX)
        && !key.ends_with(TEMP_SUFFIX)
        && !key.starts_with(PRE_UPDATE_PREFIX)
}

/// Builds the temp key used while an archive upload is in progress.
#[must_use]
pub fn temp_key(final_key: &str) -> String {
    format!("{final_key}{TEMP_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_keys_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap();
        assert!(world_backup_key(earlier) < world_backup_key(later));
    }

    #[test]
    fn test_world_backup_key_shape() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(world_backup_key(at), "worlds/20240301T120000Z.tar.gz");
    }

    #[test]
    fn test_is_backup_key() {
        assert!(is_backup_key("worlds/20240301T120000Z.tar.gz"));
        assert!(!is_backup_key("worlds/20240301T120000Z.tar.gz.part"));
        assert!(!is_backup_key("worlds/pre-update/20240301T120000Z.tar.gz"));
        assert!(!is_backup_key("instance.tar.gz"));
        assert!(!is_backup_key("worlds/readme.txt"));
    }

    #[test]
    fn test_pre_update_key_is_excluded_from_retention() {
        assert!(PRE_UPDATE_KEY.starts_with(PRE_UPDATE_PREFIX));
        assert!(!is_backup_key(PRE_UPDATE_KEY));
    }

    #[test]
    fn test_temp_key() {
        assert_eq!(temp_key("worlds/a.tar.gz"), "worlds/a.tar.gz.part");
    }
}
