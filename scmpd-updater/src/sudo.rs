//! Thin wrapper around `sudo -S`, feeding the password read from the
//! updater's own standard input (spec.md §4.3's "Permission cloning"
//! and "Atomic-ish replacement").

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

pub struct Sudo<'a> {
    password: &'a str,
}

impl<'a> Sudo<'a> {
    pub fn new(password: &'a str) -> Self {
        Self { password }
    }

    pub fn run(&self, args: &[&str]) -> Result<()> {
        let mut child = Command::new("sudo")
            .arg("-S")
            .arg("-p")
            .arg("")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn sudo {args:?}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            writeln!(stdin, "{}", self.password).context("failed to write sudo password")?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed waiting for sudo {args:?}"))?;
        if !output.status.success() {
            bail!(
                "sudo {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }
}
