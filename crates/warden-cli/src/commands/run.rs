//! `warden run` - full Prepare → Run → Exit session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use warden_core::EventSink;
use warden_session::archive::TarGzArchiver;
use warden_session::backup::ArchiveWorldBackup;
use warden_session::retention::{LocalRetention, RemoteRetention};
use warden_session::runner::ProcessRunner;
use warden_session::{detect_hostname, Orchestrator, Server, SessionConfig};

use crate::Config;

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Network address the server announces.
    #[arg(long, env = "WARDEN_SERVER_ADDRESS")]
    pub address: String,

    /// IP the server binds.
    #[arg(long, env = "WARDEN_SERVER_IP", default_value = "0.0.0.0")]
    pub ip: String,

    /// Port the server binds.
    #[arg(long, env = "WARDEN_SERVER_PORT", default_value_t = 25565)]
    pub port: u16,

    /// Memory allocation in MiB.
    #[arg(long, env = "WARDEN_SERVER_MEMORY_MB", default_value_t = 4096)]
    pub memory_mb: u32,

    /// Path of the launch script.
    #[arg(long, env = "WARDEN_LAUNCH_SCRIPT")]
    pub launch_script: PathBuf,

    /// Local backups kept after the session.
    #[arg(long, default_value_t = 3)]
    pub local_keep: usize,

    /// Remote backups kept after the session.
    #[arg(long, default_value_t = 10)]
    pub remote_keep: usize,
}

/// Executes the run command.
///
/// # Errors
///
/// Returns an error when any phase of the session fails; a failed run
/// phase is still followed by Exit so the lock is released and the world
/// backed up.
pub async fn execute(args: RunArgs, config: &Config) -> anyhow::Result<()> {
    let local = config.local_repository();
    let remote = config.remote_repository();

    let session_config = SessionConfig {
        host: detect_hostname().await,
        warden_version: env!("CARGO_PKG_VERSION").to_string(),
        instance_dir: config.instance_dir.clone(),
        world_dir: config.world_dir.clone(),
    };

    let local_archiver = Arc::new(TarGzArchiver::new(local.clone()));
    let backup = ArchiveWorldBackup::new(
        config.world_dir.clone(),
        local_archiver.clone(),
        local.clone(),
        remote.clone(),
    );

    let mut orchestrator = Orchestrator::new(
        session_config,
        config.manifest_store(),
        local_archiver,
        Arc::new(TarGzArchiver::new(remote.clone())),
        Arc::new(ProcessRunner::new()),
    )
    .with_backup(Arc::new(backup))
    .with_retention(Arc::new(LocalRetention::new(local, args.local_keep)))
    .with_retention(Arc::new(RemoteRetention::new(remote, args.remote_keep)))
    .with_events(EventSink::disabled());

    let server = Server {
        address: args.address,
        ip: args.ip,
        port: args.port,
        memory_mb: args.memory_mb,
        launch_script: args.launch_script,
    };

    orchestrator.prepare().await.context("prepare failed")?;

    // A runner failure must not skip Exit: the lock is held and the world
    // deserves a backup either way.
    let run_result = orchestrator.run(&server).await;
    let exit_result = orchestrator.exit().await;

    run_result.context("session failed")?;
    exit_result.context("exit failed")?;

    println!("session completed");
    Ok(())
}
