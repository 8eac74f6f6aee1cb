// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, recovery, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dkv_engine::Executor;
use dkv_storage::{ReplayError, SnapshotError, SnapshotStore, SyncMode, Wal, WalError};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::Notify;
use tracing::{info, warn};

/// Default address of the catch-up listener
pub const DEFAULT_CATCHUP_ADDR: &str = "127.0.0.1:1025";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the log, snapshots, PID and log files
    pub data_dir: PathBuf,
    /// Path to the command socket
    pub socket_path: PathBuf,
    /// Address the catch-up server binds
    pub catchup_addr: String,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the write-ahead log
    pub wal_path: PathBuf,
    /// Directory snapshots are written to
    pub snapshot_dir: PathBuf,
    /// Serve commands on stdin/stdout instead of the socket
    pub repl: bool,
    pub sync_mode: SyncMode,
}

impl Config {
    /// Default layout under `data_dir`
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            socket_path: data_dir.join("dkvd.sock"),
            catchup_addr: DEFAULT_CATCHUP_ADDR.to_string(),
            lock_path: data_dir.join("dkvd.pid"),
            log_path: data_dir.join("dkvd.log"),
            wal_path: data_dir.join("wal.log"),
            snapshot_dir: data_dir.join("snapshot"),
            repl: false,
            sync_mode: SyncMode::default(),
        }
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Command socket listener, absent in REPL mode
    pub listener: Option<UnixListener>,
    /// Catch-up listener, taken by the task that serves it
    pub catchup_listener: Option<TcpListener>,
    pub executor: Arc<Executor>,
    /// Signalled when a session hits a fatal inconsistency
    pub shutdown_requested: Arc<Notify>,
    /// When daemon started
    pub start_time: Instant,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        {
            let mut wal = self
                .executor
                .wal()
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if let Err(e) = wal.sync() {
                warn!("Failed to sync WAL at shutdown: {}", e);
            }
        }

        // 1. Stop accepting connections
        self.listener = None;
        self.catchup_listener = None;

        // 2. Remove socket file
        if !self.config.repl && self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 3. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Lock file is released automatically when self.lock_file is dropped

        info!(
            "Daemon shutdown complete after {}s at version {}",
            self.start_time.elapsed().as_secs(),
            self.executor.store().version()
        );
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Failed to bind catch-up listener at {0}: {1}")]
    CatchupBindFailed(String, std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // The files belong to the daemon holding the lock
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories
    std::fs::create_dir_all(&config.data_dir)?;
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.snapshot_dir)?;

    // 2. Acquire lock file FIRST - one writer per data directory.
    // Opened without truncation so a running daemon's PID survives a
    // failed second start.
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Newest snapshot, if any
    let snapshots = SnapshotStore::new(&config.snapshot_dir);
    let snapshot = match snapshots.find_newest()? {
        Some(handle) => {
            info!("Loading snapshot {}", handle.path.display());
            Some(snapshots.read(&handle)?)
        }
        None => None,
    };

    // 4. Open the log
    let mut wal = Wal::open_or_create(&config.wal_path)?.with_sync_mode(config.sync_mode);
    info!(
        "WAL is {} bytes, appends sync {:?}",
        wal.file_len(),
        wal.sync_mode()
    );

    // 5. Replay
    let (store, summary) = dkv_storage::build(snapshot, &mut wal)?;
    info!(
        "Loaded state: {} keys at version {}",
        store.len(),
        summary.version
    );

    // 6. Bind listeners (LAST - only after recovery succeeded)
    let catchup_listener = TcpListener::bind(&config.catchup_addr)
        .await
        .map_err(|e| LifecycleError::CatchupBindFailed(config.catchup_addr.clone(), e))?;

    let listener = if config.repl {
        None
    } else {
        if config.socket_path.exists() {
            std::fs::remove_file(&config.socket_path)?;
        }
        Some(
            UnixListener::bind(&config.socket_path)
                .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?,
        )
    };

    let executor = Executor::new(Arc::new(store), Arc::new(Mutex::new(wal)), snapshots);

    info!("Daemon started in {}", config.data_dir.display());

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        catchup_listener: Some(catchup_listener),
        executor: Arc::new(executor),
        shutdown_requested: Arc::new(Notify::new()),
        start_time: Instant::now(),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    // Remove socket if we created it
    if !config.repl && config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }

    // Remove PID/lock file
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
