use std::path::PathBuf;

use clap::Parser;

/// scmpd — the remote deployment agent.
#[derive(Parser, Debug)]
#[command(name = "scmpd", version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short = 'c', long = "config", default_value = "scmpd.yaml")]
    pub config: PathBuf,

    /// Start the agent and accept connections.
    #[arg(short = 's', long = "start-server")]
    pub start_server: bool,

    /// Parse the config file and exit 0 on success.
    #[arg(short = 't', long = "test-config")]
    pub test_config: bool,

    /// Run startup (config + host key load) and exit before accepting connections.
    #[arg(short = 'T', long = "dry-run")]
    pub dry_run: bool,

    /// Logging verbosity, 0 (quietest) through 4 (most verbose).
    #[arg(short = 'v', long = "verbosity", default_value_t = 2)]
    pub verbosity: u8,

    /// Print the bare version identifier used by `getupdaterversion`, and exit.
    #[arg(long = "versionid")]
    pub versionid: bool,
}
