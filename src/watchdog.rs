//! Relay process supervision
//!
//! `aria supervise` runs the relay as a child process and respawns it after
//! a short delay whenever it exits. Ctrl-c stops the watchdog and tears the
//! child down with it. Sessions are not persisted across restarts; clients
//! reconnect.

use std::time::Duration;

use tokio::process::{Child, Command};

use crate::{Error, Result};

/// Supervise the relay, restarting it on exit
///
/// `args` are passed through to each spawned `serve` child.
///
/// # Errors
///
/// Returns error if the current executable cannot be determined or a child
/// cannot be spawned.
pub async fn supervise(restart_delay: Duration, args: &[String]) -> Result<()> {
    let binary = std::env::current_exe()?;

    let mut child = spawn(&binary, args)?;
    loop {
        tokio::select! {
            exit = child.wait() => {
                let status = exit?;
                tracing::warn!(
                    %status,
                    delay_secs = restart_delay.as_secs(),
                    "relay exited, restarting"
                );
                tokio::time::sleep(restart_delay).await;
                child = spawn(&binary, args)?;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    return Err(Error::Config(format!("signal handler failed: {e}")));
                }
                tracing::info!("stopping watchdog");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill relay child");
                }
                let _ = child.wait().await;
                return Ok(());
            }
        }
    }
}

fn spawn(binary: &std::path::Path, args: &[String]) -> Result<Child> {
    tracing::info!(binary = %binary.display(), "starting relay");
    Command::new(binary)
        .arg("serve")
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .map_err(Error::Io)
}
