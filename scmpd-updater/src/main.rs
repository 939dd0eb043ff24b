mod cli;
mod logging;
mod pipeline;
mod pubkey;
mod signals;
mod sudo;
mod target;

use std::io::Read;

use clap::Parser;
use tracing::error;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if cli.versionid {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if unsafe { libc::geteuid() } == 0 {
        eprintln!("scmpd-updater refuses to run as uid 0");
        std::process::exit(1);
    }

    let _log_guard = match logging::init(&cli.logfile, cli.verbosity) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to open logfile {}: {err:#}", cli.logfile.display());
            std::process::exit(1);
        }
    };

    let Some(candidate) = cli.src.clone() else {
        error!("missing -s/--src <candidate-path>");
        std::process::exit(1);
    };

    // Block the signals that could let the supervisor kill us between
    // the `rm` and the `mv` before we do anything else.
    signals::ignore_termination_signals();

    let mut sudo_password = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut sudo_password) {
        error!(error = %err, "failed to read sudo password from stdin");
        std::process::exit(1);
    }
    let sudo_password = sudo_password.trim_end_matches(['\n', '\r']).to_string();

    let request = pipeline::UpdateRequest {
        candidate: &candidate,
        update_updater: cli.update_updater,
        dry_run: cli.dry_run,
        sudo_password: &sudo_password,
    };

    match pipeline::run(request) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!(error = %err, "update pipeline failed");
            std::process::exit(1);
        }
    }
}
