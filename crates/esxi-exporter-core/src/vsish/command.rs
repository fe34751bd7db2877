//! `vsish` invoked as a subprocess.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{trace, warn};

use super::{CommandError, Vsish};

/// Runs the real `vsish` binary.
///
/// Every invocation is bounded by a timeout; a child that outlives it is
/// killed when its future is dropped.
#[derive(Debug, Clone)]
pub struct VsishCommand {
    binary: PathBuf,
    timeout: Duration,
}

impl VsishCommand {
    /// Timeout applied when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a runner for the given binary (a bare name is looked up in `PATH`).
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run<I, S>(&self, args: I) -> Result<String, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(result) => result
                .map_err(|e| CommandError::Spawn(format!("{}: {}", self.binary.display(), e)))?,
            Err(_) => {
                warn!(binary = %self.binary.display(), timeout = ?self.timeout, "vsish timed out, killed");
                return Err(CommandError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            return Err(CommandError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        trace!(bytes = output.stdout.len(), "vsish output");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for VsishCommand {
    fn default() -> Self {
        Self::new("vsish")
    }
}

#[async_trait]
impl Vsish for VsishCommand {
    async fn ls(&self, path: &str) -> Result<String, CommandError> {
        self.run(["-e", "ls", path]).await
    }

    async fn cat(&self, paths: &[String]) -> Result<String, CommandError> {
        let args = ["-p", "-e", "cat"]
            .into_iter()
            .map(str::to_owned)
            .chain(paths.iter().cloned());
        self.run(args).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let vsish = VsishCommand::new("/nonexistent/vsish-12345");
        let err = vsish.ls("/net/openPorts").await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn(_)));
        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        // `false` ignores its arguments and exits 1.
        let vsish = VsishCommand::new("false");
        let err = vsish.cat(&["/net/openPorts/1/type".to_string()]).await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_successful_run_returns_stdout() {
        // `true` ignores its arguments and prints nothing.
        let vsish = VsishCommand::new("true").with_timeout(Duration::from_secs(5));
        assert_eq!(vsish.ls("/net/openPorts").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_hung_tool_times_out() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("vsish");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let vsish = VsishCommand::new(&script).with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let mut result = vsish.ls("/net/openPorts").await;
        // A freshly written script can briefly report "text file busy" while
        // another test forks.
        for _ in 0..3 {
            if !matches!(result, Err(CommandError::Spawn(_))) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            result = vsish.ls("/net/openPorts").await;
        }

        let err = result.unwrap_err();
        assert!(matches!(err, CommandError::Timeout(limit) if limit == Duration::from_millis(200)));
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
