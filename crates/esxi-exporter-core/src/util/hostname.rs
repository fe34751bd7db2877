//! Local host name lookup.

use std::env;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Gets the machine hostname via the `hostname` command.
///
/// Falls back to `$HOSTNAME`, then to an empty string. Not cached: the name
/// is looked up on every call.
pub async fn hostname(limit: Duration) -> String {
    let mut cmd = Command::new("hostname");
    cmd.kill_on_drop(true);

    let from_command = match timeout(limit, cmd.output()).await {
        Ok(Ok(out)) if out.status.success() => String::from_utf8(out.stdout)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        Ok(Ok(out)) => {
            debug!(status = %out.status, "hostname command failed");
            None
        }
        Ok(Err(e)) => {
            debug!(error = %e, "hostname command unavailable");
            None
        }
        Err(_) => {
            debug!(timeout = ?limit, "hostname command timed out");
            None
        }
    };

    from_command
        .or_else(|| env::var("HOSTNAME").ok().filter(|s| !s.is_empty()))
        .unwrap_or_default()
}
