//! The updater ignores termination-ish signals across its critical
//! section (spec.md §4.3, §9 "Signal deferral vs ignore") so the
//! supervisor cannot kill it between the `rm` and the `mv`.

/// Set SIGTERM, SIGINT, SIGHUP, and SIGQUIT to `SIG_IGN`. There is no
/// corresponding "restore" call: the process either completes the
/// critical section and signals the target, or aborts before touching
/// the filesystem and exits immediately after.
pub fn ignore_termination_signals() {
    unsafe {
        libc::signal(libc::SIGTERM, libc::SIG_IGN);
        libc::signal(libc::SIGINT, libc::SIG_IGN);
        libc::signal(libc::SIGHUP, libc::SIG_IGN);
        libc::signal(libc::SIGQUIT, libc::SIG_IGN);
    }
}

/// Send SIGTERM to `pid` so the supervisor restarts it with the
/// replaced binary.
pub fn terminate(pid: u32) -> std::io::Result<()> {
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
