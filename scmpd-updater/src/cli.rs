use std::path::PathBuf;

use clap::Parser;

/// scmpd-updater — verifies and installs a signed agent binary.
#[derive(Parser, Debug)]
#[command(name = "scmpd-updater", version, about, long_about = None)]
pub struct Cli {
    /// Path to the candidate binary to verify and install.
    #[arg(short = 's', long = "src")]
    pub src: Option<PathBuf>,

    /// Replace the updater itself rather than its parent agent.
    #[arg(short = 'u', long = "update-updater")]
    pub update_updater: bool,

    /// Path to the updater's own log file.
    #[arg(short = 'l', long = "logfile", default_value = "/tmp/scmpd_updater.log")]
    pub logfile: PathBuf,

    /// Verify and log the pipeline without mutating the target.
    #[arg(short = 'T', long = "dry-run")]
    pub dry_run: bool,

    /// Logging verbosity, 0 (quietest) through 4 (most verbose).
    #[arg(short = 'v', long = "verbosity", default_value_t = 2)]
    pub verbosity: u8,

    /// Print the bare version identifier and exit.
    #[arg(long = "versionid")]
    pub versionid: bool,
}
