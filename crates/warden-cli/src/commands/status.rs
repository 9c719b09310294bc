//! `warden status` - show both manifests and their drift.

use clap::Args;

use warden_session::validator::{check_instance, check_lock, check_world};
use warden_session::{Manifest, Scope, SessionError};

use crate::Config;

/// Arguments for the status command.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print the manifests as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

/// Executes the status command.
///
/// # Errors
///
/// Returns an error when a manifest exists but cannot be read.
pub async fn execute(args: &StatusArgs, config: &Config) -> anyhow::Result<()> {
    let store = config.manifest_store();

    let local = load_optional(&store, Scope::Local).await?;
    let remote = load_optional(&store, Scope::Remote).await?;

    if args.json {
        let doc = serde_json::json!({
            "local": local,
            "remote": remote,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    print_scope("local", local.as_ref());
    print_scope("remote", remote.as_ref());

    match (&local, &remote) {
        (Some(local), Some(remote)) => {
            print_check("lock", check_lock(local, remote).err());
            print_check("instance", check_instance(local, remote).err());
            print_check("world", check_world(local, remote).err());
        }
        (None, Some(_)) => println!("drift:    local replica not seeded yet"),
        (_, None) => println!("drift:    remote manifest missing, instance not provisioned"),
    }

    Ok(())
}

async fn load_optional(
    store: &warden_session::ManifestStore,
    scope: Scope,
) -> anyhow::Result<Option<Manifest>> {
    match store.load(scope).await {
        Ok(manifest) => Ok(Some(manifest)),
        Err(SessionError::ManifestMissing { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn print_scope(name: &str, manifest: Option<&Manifest>) {
    match manifest {
        Some(m) => {
            let lock = if m.is_locked() {
                m.locked_by.as_str()
            } else {
                "unlocked"
            };
            println!(
                "{name:>7}:  warden {}, instance {}, {} worlds, {lock}, updated {}",
                m.warden_version,
                m.instance_version,
                m.worlds.len(),
                m.updated_at.to_rfc3339(),
            );
        }
        None => println!("{name:>7}:  (missing)"),
    }
}

fn print_check(name: &str, finding: Option<warden_session::ValidationError>) {
    match finding {
        None => println!("{name:>7}:  ok"),
        Some(e) => println!("{name:>7}:  {e}"),
    }
}
