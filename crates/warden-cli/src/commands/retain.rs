//! `warden retain` - apply the retention policies.

use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use warden_session::retention::{LocalRetention, RemoteRetention, RetentionPolicy};
use warden_session::Scope;

use crate::Config;

/// Arguments for the retain command.
#[derive(Debug, Args)]
pub struct RetainArgs {
    /// Local backups to keep.
    #[arg(long, default_value_t = 3)]
    pub local_keep: usize,

    /// Remote backups to keep.
    #[arg(long, default_value_t = 10)]
    pub remote_keep: usize,

    /// Print what would be deleted without deleting.
    #[arg(long)]
    pub dry_run: bool,
}

/// Executes the retain command.
///
/// # Errors
///
/// Returns an error when the remote manifest cannot be read or a deletion
/// fails.
pub async fn execute(args: &RetainArgs, config: &Config) -> anyhow::Result<()> {
    let store = config.manifest_store();
    let manifest = store
        .load(Scope::Remote)
        .await
        .context("remote manifest is required for retention")?;

    let policies: [(&str, Arc<dyn RetentionPolicy>); 2] = [
        (
            "local",
            Arc::new(LocalRetention::new(
                config.local_repository(),
                args.local_keep,
            )),
        ),
        (
            "remote",
            Arc::new(RemoteRetention::new(
                config.remote_repository(),
                args.remote_keep,
            )),
        ),
    ];

    for (name, policy) in policies {
        if args.dry_run {
            let plan = policy.plan(&manifest).await?;
            println!(
                "{name}: would keep {}, delete {} capped + {} dangling",
                plan.keep.len(),
                plan.delete.len(),
                plan.dangling.len()
            );
            for key in plan.delete.iter().chain(plan.dangling.iter()) {
                println!("{name}:   rm {key}");
            }
        } else {
            let report = policy.apply(&manifest).await?;
            println!(
                "{name}: kept {}, deleted {}",
                report.kept.len(),
                report.total_deleted()
            );
        }
    }

    Ok(())
}
