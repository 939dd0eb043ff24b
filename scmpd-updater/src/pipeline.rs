//! The verify → strip → clone-permissions → replace → signal pipeline
//! (spec.md §4.3).

use std::path::Path;

use anyhow::{bail, Context, Result};
use scmpd_common::sigsection;
use tracing::{info, warn};

use crate::sudo::Sudo;
use crate::target::{self, TargetPermissions};

pub struct UpdateRequest<'a> {
    pub candidate: &'a Path,
    pub update_updater: bool,
    pub dry_run: bool,
    pub sudo_password: &'a str,
}

/// Run the full pipeline. On success the target process has been sent
/// SIGTERM and the caller should exit immediately afterwards.
pub fn run(req: UpdateRequest<'_>) -> Result<()> {
    let public_key = crate::pubkey::load()?;

    let section = sigsection::dump_section(req.candidate)
        .context("candidate binary has no sigdata section")?;
    let signature = sigsection::decode_signature(&section).context("malformed sigdata section")?;

    sigsection::remove_section(req.candidate).context("failed to strip sigdata section")?;
    let stripped = std::fs::read(req.candidate).context("failed to read stripped candidate")?;

    if !sigsection::verify(&public_key, &stripped, &signature) {
        bail!("signature verification failed, aborting before any filesystem mutation");
    }
    info!(candidate = %req.candidate.display(), "signature verified");

    let pid = target::target_pid(req.update_updater);
    let target_path = target::resolve_exe_path(pid)
        .with_context(|| format!("failed to resolve target executable for pid {pid}"))?;
    let permissions = target::stat_permissions(&target_path)?;

    if req.dry_run {
        info!(
            target = %target_path.display(),
            pid,
            "dry run: verified signature and resolved target, stopping here"
        );
        return Ok(());
    }

    let sudo = Sudo::new(req.sudo_password);
    clone_permissions(&sudo, req.candidate, &permissions)?;

    replace(&sudo, req.candidate, &target_path)?;

    crate::signals::terminate(pid)
        .with_context(|| format!("failed to signal target pid {pid}"))?;
    info!(pid, "sent termination signal to target process");

    Ok(())
}

fn clone_permissions(sudo: &Sudo, candidate: &Path, perms: &TargetPermissions) -> Result<()> {
    let mode = format!("{:o}", perms.mode);
    let owner = format!("{}:{}", perms.uid, perms.gid);
    let candidate_str = candidate.to_string_lossy();

    sudo.run(&["chmod", &mode, &candidate_str])
        .context("permission-set command failed, target left intact")?;
    sudo.run(&["chown", &owner, &candidate_str])
        .context("permission-set command failed, target left intact")?;
    Ok(())
}

fn replace(sudo: &Sudo, candidate: &Path, target: &Path) -> Result<()> {
    let candidate_str = candidate.to_string_lossy();
    let target_str = target.to_string_lossy();

    sudo.run(&["rm", &target_str])
        .context("failed to remove current target, aborting before move")?;

    if let Err(err) = sudo.run(&["mv", &candidate_str, &target_str]) {
        warn!(error = %err, "mv failed after rm succeeded: target is now missing, recovery is external");
        return Err(err);
    }
    Ok(())
}
