//! The streaming subprocess bridge (spec.md §4.2): run a command line as
//! a local child process, pipe the controller's stdin in, stream stdout
//! and stderr back, and report an exit status.

use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// The result of running one command: verbatim stdout, the stderr to
/// report to the controller (empty on success, per spec.md §4.2's
/// sudo-prompt rationale), and the exit code to encode into the
/// `exit-status` channel request.
pub struct ExecOutcome {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: u32,
}

const CANNOT_EXECUTE_MESSAGE: &[u8] = b"Command exists but cannot execute";

/// Run `command_line` as a child process with `stdin` piped to it.
///
/// `stdin` is the full buffer the controller uploaded before the child
/// was started — there is no interleaved streaming contract (spec.md
/// §4.2, "Input wiring").
pub async fn run(command_line: &str, stdin: Vec<u8>) -> ExecOutcome {
    let mut parts = command_line.split_whitespace();
    let Some(program) = parts.next() else {
        return ExecOutcome {
            stdout: Vec::new(),
            stderr: b"empty command".to_vec(),
            exit_code: 127,
        };
    };
    let args: Vec<&str> = parts.collect();

    let mut child = match Command::new(program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(command = command_line, "executable not found");
            return ExecOutcome {
                stdout: Vec::new(),
                stderr: err.to_string().into_bytes(),
                exit_code: 127,
            };
        }
        Err(err) => {
            warn!(command = command_line, error = %err, "spawn failed");
            return ExecOutcome {
                stdout: Vec::new(),
                stderr: CANNOT_EXECUTE_MESSAGE.to_vec(),
                exit_code: 126,
            };
        }
    };

    if let Some(mut child_stdin) = child.stdin.take() {
        if let Err(err) = child_stdin.write_all(&stdin).await {
            warn!(error = %err, "failed writing buffered stdin to child");
        }
        drop(child_stdin);
    }

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_end(&mut stdout_buf).await;
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_end(&mut stderr_buf).await;
    }

    let status = match child.wait().await {
        Ok(status) => status,
        Err(err) => {
            warn!(error = %err, "failed waiting for child");
            return ExecOutcome {
                stdout: stdout_buf,
                stderr: err.to_string().into_bytes(),
                exit_code: 126,
            };
        }
    };

    match status.code() {
        Some(0) => ExecOutcome {
            stdout: stdout_buf,
            stderr: Vec::new(),
            exit_code: 0,
        },
        Some(code) => ExecOutcome {
            stdout: stdout_buf,
            stderr: stderr_buf,
            exit_code: code as u32,
        },
        None => ExecOutcome {
            stdout: stdout_buf,
            stderr: stderr_buf,
            exit_code: 126,
        },
    }
}

/// Encode an exit code as the 4-byte big-endian payload of an
/// `exit-status` channel request (spec.md §4.2, last paragraph).
pub fn encode_exit_status(code: u32) -> [u8; 4] {
    code.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script_path(contents: &str) -> std::path::PathBuf {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        let path = f.into_temp_path();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.keep().unwrap()
    }

    #[tokio::test]
    async fn success_has_empty_stderr_even_if_child_wrote_to_it() {
        let path = script_path("#!/bin/sh\necho out\necho err >&2\n");
        let outcome = run(path.to_str().unwrap(), Vec::new()).await;
        let _ = std::fs::remove_file(&path);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, b"out\n");
        assert!(outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_reports_actual_code() {
        let path = script_path("#!/bin/sh\nexit 3\n");
        let outcome = run(path.to_str().unwrap(), Vec::new()).await;
        let _ = std::fs::remove_file(&path);
        assert_eq!(outcome.exit_code, 3);
    }

    #[tokio::test]
    async fn missing_executable_is_127() {
        let outcome = run("/no/such/binary-xyz", Vec::new()).await;
        assert_eq!(outcome.exit_code, 127);
        assert!(!outcome.stderr.is_empty());
    }

    #[test]
    fn encodes_exit_status_big_endian() {
        assert_eq!(encode_exit_status(1), [0x00, 0x00, 0x00, 0x01]);
        assert_eq!(encode_exit_status(0), [0x00, 0x00, 0x00, 0x00]);
    }
}
