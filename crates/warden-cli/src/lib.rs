//! # warden-cli
//!
//! Command-line interface for the warden game-server host.
//!
//! ## Commands
//!
//! - `warden run` - Run a full Prepare → Run → Exit session
//! - `warden status` - Show both manifests and their drift
//! - `warden unlock` - Force-clear a stale lock (admin recovery)
//! - `warden retain` - Apply the retention policies
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `WARDEN_LOCAL_DIR` - Root of the local working copy
//! - `WARDEN_REMOTE_DIR` - Root of the remote store (mounted path)
//! - `WARDEN_WORLD_DIR` - Directory the active world lives in
//! - `WARDEN_INSTANCE_DIR` - Directory the application bundle is extracted into

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use warden_core::{FsRepository, StorageRepository};
use warden_session::ManifestStore;

/// Warden CLI - game-server host command-line interface.
#[derive(Debug, Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root of the local working copy.
    #[arg(long, env = "WARDEN_LOCAL_DIR", default_value = "./warden/local")]
    pub local_dir: PathBuf,

    /// Root of the remote store (a mounted bucket or shared path).
    #[arg(long, env = "WARDEN_REMOTE_DIR")]
    pub remote_dir: PathBuf,

    /// Directory the active world lives in.
    #[arg(long, env = "WARDEN_WORLD_DIR", default_value = "./warden/world")]
    pub world_dir: PathBuf,

    /// Directory the application bundle is extracted into.
    #[arg(long, env = "WARDEN_INSTANCE_DIR", default_value = "./warden/instance")]
    pub instance_dir: PathBuf,

    /// Emit JSON logs instead of pretty ones.
    #[arg(long, env = "WARDEN_LOG_JSON")]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            local_dir: self.local_dir.clone(),
            remote_dir: self.remote_dir.clone(),
            world_dir: self.world_dir.clone(),
            instance_dir: self.instance_dir.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a full Prepare → Run → Exit session.
    Run(commands::run::RunArgs),
    /// Show both manifests and their drift.
    Status(commands::status::StatusArgs),
    /// Force-clear a stale lock (admin recovery).
    Unlock(commands::unlock::UnlockArgs),
    /// Apply the retention policies.
    Retain(commands::retain::RetainArgs),
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the local working copy.
    pub local_dir: PathBuf,
    /// Root of the remote store.
    pub remote_dir: PathBuf,
    /// Directory the active world lives in.
    pub world_dir: PathBuf,
    /// Directory the application bundle is extracted into.
    pub instance_dir: PathBuf,
}

impl Config {
    /// Opens the local repository.
    #[must_use]
    pub fn local_repository(&self) -> Arc<dyn StorageRepository> {
        Arc::new(FsRepository::new(&self.local_dir))
    }

    /// Opens the remote repository.
    #[must_use]
    pub fn remote_repository(&self) -> Arc<dyn StorageRepository> {
        Arc::new(FsRepository::new(&self.remote_dir))
    }

    /// Builds the manifest store over both repositories.
    #[must_use]
    pub fn manifest_store(&self) -> ManifestStore {
        ManifestStore::new(self.local_repository(), self.remote_repository())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_from_flags() {
        let cli = Cli::parse_from([
            "warden",
            "--remote-dir",
            "/srv/warden/remote",
            "--local-dir",
            "/srv/warden/local",
            "status",
        ]);

        let config = cli.config();
        assert_eq!(config.remote_dir, PathBuf::from("/srv/warden/remote"));
        assert_eq!(config.local_dir, PathBuf::from("/srv/warden/local"));
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["warden", "--remote-dir", "/srv/remote", "status"]);
        assert_eq!(cli.local_dir, PathBuf::from("./warden/local"));
        assert_eq!(cli.world_dir, PathBuf::from("./warden/world"));
        assert!(!cli.log_json);
    }
}
