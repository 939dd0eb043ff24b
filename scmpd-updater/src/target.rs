//! Target discovery and permission cloning (spec.md §4.3).

use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DELETED_SUFFIX: &str = " (deleted)";

/// The process id whose binary this invocation will replace: the
/// updater's own pid in `--update-updater` mode, otherwise its parent
/// (the agent).
pub fn target_pid(update_updater: bool) -> u32 {
    if update_updater {
        std::process::id()
    } else {
        unsafe { libc::getppid() as u32 }
    }
}

/// Resolve `/proc/<pid>/exe`, stripping the kernel's
/// `" (deleted)"` marker for an already-unlinked executable.
pub fn resolve_exe_path(pid: u32) -> Result<PathBuf> {
    let link = format!("/proc/{pid}/exe");
    let resolved = std::fs::read_link(&link)
        .with_context(|| format!("failed to read {link}"))?;
    Ok(PathBuf::from(strip_deleted_suffix(&resolved.to_string_lossy())))
}

fn strip_deleted_suffix(path: &str) -> &str {
    path.strip_suffix(DELETED_SUFFIX).unwrap_or(path)
}

/// Ownership and mode bits of the currently installed target, to be
/// cloned onto the verified candidate before it replaces the target.
pub struct TargetPermissions {
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
}

pub fn stat_permissions(target: &std::path::Path) -> Result<TargetPermissions> {
    let meta = std::fs::metadata(target)
        .with_context(|| format!("failed to stat target {}", target.display()))?;
    Ok(TargetPermissions {
        uid: meta.uid(),
        gid: meta.gid(),
        mode: meta.mode() & 0o7777,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn strips_deleted_marker() {
        assert_eq!(
            strip_deleted_suffix("/opt/scmpd/scmpd (deleted)"),
            "/opt/scmpd/scmpd"
        );
    }

    #[test]
    fn leaves_ordinary_path_untouched() {
        assert_eq!(strip_deleted_suffix("/opt/scmpd/scmpd"), "/opt/scmpd/scmpd");
    }

    #[test]
    fn stat_permissions_reads_mode_and_owner() {
        let f = tempfile::NamedTempFile::new().unwrap();
        std::fs::set_permissions(f.path(), std::fs::Permissions::from_mode(0o640)).unwrap();
        let perms = stat_permissions(f.path()).unwrap();
        assert_eq!(perms.mode, 0o640);
    }
}
