// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dkv daemon (dkvd)
//!
//! Owns the log and the in-memory store, serves commands on a Unix socket
//! (or stdin with `--repl`) and streams the log to catch-up clients.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dkv_daemon::lifecycle::{self, Config, LifecycleError, DEFAULT_CATCHUP_ADDR};
use dkv_daemon::server::SessionEnd;
use dkv_daemon::{catchup, repl, server};
use dkv_storage::SyncMode;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dkvd", version, about = "Durable key-value store daemon")]
struct Args {
    /// Directory holding wal.log, snapshot/, dkvd.pid and dkvd.log
    #[arg(long, env = "DKV_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Command socket path [default: <data-dir>/dkvd.sock]
    #[arg(long, env = "DKV_SOCKET")]
    sock: Option<PathBuf>,

    /// Address for the catch-up listener
    #[arg(long, env = "DKV_CATCHUP_ADDR", default_value = DEFAULT_CATCHUP_ADDR)]
    catchup_addr: String,

    /// Read commands from stdin instead of the socket
    #[arg(long)]
    repl: bool,

    /// Do not fsync after each append; use the `sync` command instead
    #[arg(long)]
    no_fsync: bool,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::for_data_dir(&self.data_dir);
        if let Some(sock) = self.sock {
            config.socket_path = sock;
        }
        config.catchup_addr = self.catchup_addr;
        config.repl = self.repl;
        if self.no_fsync {
            config.sync_mode = SyncMode::Never;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config();

    // Write startup marker to log (before tracing setup, so it precedes
    // anything this attempt logs)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!("Starting dkvd in {}", config.data_dir.display());

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    if let Some(listener) = daemon.catchup_listener.take() {
        info!("Catch-up listening on {}", listener.local_addr()?);
        tokio::spawn(catchup::serve(
            listener,
            Arc::clone(daemon.executor.wal()),
        ));
    }

    if let Some(listener) = daemon.listener.take() {
        tokio::spawn(server::serve(
            listener,
            Arc::clone(&daemon.executor),
            Arc::clone(&daemon.shutdown_requested),
        ));
        info!(
            "Daemon ready, listening on {}",
            config.socket_path.display()
        );
        // Signal ready for a parent process waiting on startup
        println!("READY");
    } else {
        let executor = Arc::clone(&daemon.executor);
        let shutdown = Arc::clone(&daemon.shutdown_requested);
        tokio::spawn(async move {
            match repl::run(executor, Arc::clone(&shutdown)).await {
                Ok(SessionEnd::Eof) => info!("stdin closed"),
                Ok(SessionEnd::Fatal) => {}
                Err(e) => error!("REPL failed: {}", e),
            }
            shutdown.notify_one();
        });
    }

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        _ = daemon.shutdown_requested.notified() => info!("Shutdown requested, shutting down..."),
    }

    daemon.shutdown()?;
    info!("Daemon stopped");
    drop(log_guard);
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- dkvd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- dkvd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = match config.log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = config
        .log_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dkvd.log"));

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
