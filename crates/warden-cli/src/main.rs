//! Warden CLI - the main entry point for the `warden` binary.

use anyhow::Result;
use clap::Parser;

use warden_cli::{Cli, Commands};
use warden_core::observability::{init_logging, LogFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let config = cli.config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Run(args) => warden_cli::commands::run::execute(args, &config).await,
            Commands::Status(args) => warden_cli::commands::status::execute(&args, &config).await,
            Commands::Unlock(args) => warden_cli::commands::unlock::execute(&args, &config).await,
            Commands::Retain(args) => warden_cli::commands::retain::execute(&args, &config).await,
        }
    })
}
