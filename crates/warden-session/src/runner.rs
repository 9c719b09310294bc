//! Server execution collaborator.

use async_trait::async_trait;

use crate::error::{Result, SessionError};
use crate::manifest::Server;

/// Launches the game server and blocks for its lifetime.
#[async_trait]
pub trait ServerRunner: Send + Sync + 'static {
    /// Runs the server described by `server` to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be spawned or exited
    /// with a non-zero status.
    async fn run(&self, server: &Server) -> Result<()>;
}

/// Spawns the launch script as a child process.
///
/// Execution parameters are exported through the environment so launch
/// scripts stay shell-agnostic:
/// `WARDEN_SERVER_ADDRESS`, `WARDEN_SERVER_IP`, `WARDEN_SERVER_PORT`,
/// `WARDEN_SERVER_MEMORY_MB`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a process runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServerRunner for ProcessRunner {
    async fn run(&self, server: &Server) -> Result<()> {
        let script = &server.launch_script;
        tracing::info!(
            script = %script.display(),
            address = %server.address,
            port = server.port,
            memory_mb = server.memory_mb,
            "launching game server"
        );

        let status = tokio::process::Command::new(script)
            .env("WARDEN_SERVER_ADDRESS", &server.address)
            .env("WARDEN_SERVER_IP", &server.ip)
            .env("WARDEN_SERVER_PORT", server.port.to_string())
            .env("WARDEN_SERVER_MEMORY_MB", server.memory_mb.to_string())
            .status()
            .await
            .map_err(|e| SessionError::Runner {
                message: format!("spawn {}: {e}", script.display()),
            })?;

        if !status.success() {
            return Err(SessionError::Runner {
                message: format!(
                    "{} exited with status {}",
                    script.display(),
                    status.code().map_or_else(|| "signal".to_string(), |c| c.to_string())
                ),
            });
        }

        tracing::info!(script = %script.display(), "game server exited cleanly");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn server(script: PathBuf) -> Server {
        Server {
            address: "play.example.net".into(),
            ip: "0.0.0.0".into(),
            port: 25565,
            memory_mb: 4096,
            launch_script: script,
        }
    }

    #[cfg(unix)]
    async fn write_script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("launch.sh");
        tokio::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
            .await
            .unwrap();
        let mut perms = tokio::fs::metadata(&path).await.unwrap().permissions();
        perms.set_mode(0o755);
        tokio::fs::set_permissions(&path, perms).await.unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_exit() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "exit 0").await;

        let runner = ProcessRunner::new();
        runner.run(&server(script)).await.expect("clean exit");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "exit 3").await;

        let runner = ProcessRunner::new();
        let err = runner.run(&server(script)).await.expect_err("should fail");
        assert!(matches!(err, SessionError::Runner { .. }));
        assert!(err.to_string().contains('3'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_environment_is_exported() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            r#"[ "$WARDEN_SERVER_PORT" = "25565" ] || exit 1"#,
        )
        .await;

        let runner = ProcessRunner::new();
        runner.run(&server(script)).await.expect("env visible");
    }

    #[tokio::test]
    async fn test_missing_script_is_error() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(&server(PathBuf::from("/nonexistent/launch.sh")))
            .await
            .expect_err("should fail");
        assert!(matches!(err, SessionError::Runner { .. }));
    }
}
