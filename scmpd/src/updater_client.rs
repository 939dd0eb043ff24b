//! Invokes the external updater helper (spec.md §4.1's `update` /
//! `updateupdater` / `getupdaterversion` rows, and §4.3).
//!
//! The agent's role here is thin: it shells out to `UpdaterProgram` with
//! the right flags and surfaces its exit code / stdout back to the
//! controller. The actual verify-replace-signal pipeline lives entirely
//! in the `scmpd-updater` binary.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::warn;

use crate::config::ScmpdConfig;

/// Run the updater against a candidate binary path, piping `sudo_password`
/// to its standard input (spec.md §4.3's preconditions). Returns the exit
/// code to surface to the controller via `exit-status`.
pub async fn run_update(
    config: &Arc<ScmpdConfig>,
    candidate_path: &str,
    update_updater: bool,
    sudo_password: Vec<u8>,
) -> u32 {
    let mut cmd = Command::new(&config.updater_program);
    cmd.arg("-s").arg(candidate_path);
    if update_updater {
        cmd.arg("--update-updater");
    }
    run_piping_no_output(cmd, sudo_password).await
}

/// Run `UpdaterProgram --versionid` and return its stdout alongside the
/// exit code (spec.md §4.1, `getupdaterversion` row).
pub async fn run_versionid(config: &Arc<ScmpdConfig>) -> (Vec<u8>, u32) {
    let mut cmd = Command::new(&config.updater_program);
    cmd.arg("--versionid");
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(error = %err, "failed to spawn updater for --versionid");
            return (Vec::new(), 127);
        }
    };

    let mut stdout_buf = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_end(&mut stdout_buf).await;
    }

    let code = match child.wait().await {
        Ok(status) => status.code().unwrap_or(126) as u32,
        Err(err) => {
            warn!(error = %err, "failed waiting for updater");
            126
        }
    };
    (stdout_buf, code)
}

/// Spawn `cmd`, pipe `sudo_password` to its stdin and nothing meaningful
/// back (the update path only reports success/failure via exit code), and
/// return the exit code.
async fn run_piping_no_output(mut cmd: Command, sudo_password: Vec<u8>) -> u32 {
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(error = %err, "failed to spawn updater");
            return 127;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(err) = stdin.write_all(&sudo_password).await {
            warn!(error = %err, "failed to write sudo password to updater stdin");
        }
        let _ = stdin.shutdown().await;
    }

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_end(&mut stdout_buf).await;
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_end(&mut stderr_buf).await;
    }
    if !stderr_buf.is_empty() {
        warn!(stderr = %String::from_utf8_lossy(&stderr_buf), "updater stderr");
    }

    match child.wait().await {
        Ok(status) => status.code().unwrap_or(126) as u32,
        Err(err) => {
            warn!(error = %err, "failed waiting for updater");
            126
        }
    }
}
