mod cli;
mod config;
mod exec;
mod keys;
mod logging;
mod server;
mod sftp;
mod updater_client;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use russh::server::{run_stream, Config as RusshConfig, Server as RusshServer};
use russh::MethodSet;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use cli::Cli;
use config::load_config;
use server::ScmpdServer;

/// Gap enforced between accepted connections (spec.md §5, rate limiter).
const INTER_CONNECTION_DELAY: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.versionid {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err:#}");
            std::process::exit(1);
        }
    };

    if cli.test_config {
        println!("config OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init(cli.verbosity);

    let host_key = match keys::load_host_key(&config.ssh_server.ssh_priv_key_file) {
        Ok(key) => key,
        Err(err) => {
            error!(error = %err, "failed to load SSH host key");
            std::process::exit(1);
        }
    };

    if cli.dry_run {
        info!("dry run: config and host key loaded successfully, exiting");
        return Ok(());
    }

    if !cli.start_server {
        eprintln!("nothing to do: pass -s/--start-server to run the agent (see --help)");
        return Ok(());
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the async runtime")?
        .block_on(run_server(Arc::new(config), host_key))
}

async fn run_server(config: Arc<config::ScmpdConfig>, host_key: russh::keys::PrivateKey) -> Result<()> {
    let listen_addr = config.listen_socket_addr_string();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!(address = listen_addr, "scmpd listening");

    let russh_config = Arc::new(RusshConfig {
        methods: MethodSet::PUBLICKEY,
        keys: vec![host_key],
        server_id: russh::SshId::Standard(format!(
            "SSH-2.0-OpenSSH_{}",
            env!("CARGO_PKG_VERSION")
        )),
        ..Default::default()
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_signal_listener(shutdown.clone());

    loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("termination signal observed between connections, exiting accept loop");
            break;
        }

        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        info!(%peer, "accepted connection");

        let mut server = ScmpdServer {
            config: config.clone(),
        };
        let handler = server.new_client(Some(peer));
        let conn_config = russh_config.clone();

        // One connection at a time (spec.md §5): spawn the connection so
        // a panic anywhere in the handler (exec, sftp, russh's own
        // dispatch) is caught by tokio as a `JoinError` instead of
        // unwinding into this loop and killing the server, then await it
        // fully before accepting the next (deferred, not blocked,
        // cancellation per spec.md §5/§9).
        match tokio::spawn(async move { run_stream(conn_config, socket, handler).await }).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(error = %err, %peer, "connection ended with an error");
            }
            Err(join_err) if join_err.is_panic() => {
                error!(error = %join_err, %peer, "connection handler panicked, server continues");
            }
            Err(join_err) => {
                warn!(error = %join_err, %peer, "connection task did not complete normally");
            }
        }

        tokio::time::sleep(INTER_CONNECTION_DELAY).await;
    }

    Ok(())
}

fn spawn_signal_listener(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(sig) => sig,
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT");
            }
        }
        shutdown.store(true, Ordering::SeqCst);
    });
}
