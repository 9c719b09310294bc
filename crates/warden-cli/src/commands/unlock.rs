//! `warden unlock` - force-clear a stale lock.
//!
//! Recovery tool for locks left behind by crashed hosts. Refuses to clear
//! a token minted by a different host unless `--force` is given, since
//! that host may still be running.

use clap::Args;

use warden_session::{detect_hostname, Scope, SessionError};

use crate::Config;

/// Arguments for the unlock command.
#[derive(Debug, Args)]
pub struct UnlockArgs {
    /// Clear the lock even when it was minted by a different host.
    #[arg(long)]
    pub force: bool,
}

/// Executes the unlock command.
///
/// # Errors
///
/// Returns an error when a manifest cannot be read or written, or when the
/// lock belongs to another host and `--force` was not given.
pub async fn execute(args: &UnlockArgs, config: &Config) -> anyhow::Result<()> {
    let store = config.manifest_store();
    let this_host = detect_hostname().await;
    let mut cleared = 0_u32;

    for scope in [Scope::Local, Scope::Remote] {
        let mut manifest = match store.load(scope).await {
            Ok(m) => m,
            Err(SessionError::ManifestMissing { .. }) => continue,
            Err(e) => return Err(e.into()),
        };

        if !manifest.is_locked() {
            continue;
        }

        let holder_host = manifest.locked_by.split("__").next().unwrap_or_default();
        if holder_host != this_host && !args.force {
            anyhow::bail!(
                "{scope} lock {:?} was minted by host {holder_host:?}, not {this_host:?}; \
                 pass --force to clear it anyway",
                manifest.locked_by,
            );
        }

        tracing::warn!(
            scope = %scope,
            token = %manifest.locked_by,
            "force-clearing lock"
        );
        manifest.locked_by.clear();
        store.save(scope, &manifest).await?;
        cleared += 1;
    }

    if cleared == 0 {
        println!("nothing to unlock");
    } else {
        println!("cleared {cleared} lock(s)");
    }
    Ok(())
}
