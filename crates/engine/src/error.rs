// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for command execution

use dkv_storage::{SnapshotError, StoreError, WalError};
use thiserror::Error;

/// Errors that can occur while executing a command
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("append failed: {0}")]
    Append(#[source] WalError),
    #[error("reading log for snapshot failed: {0}")]
    LogCapture(#[source] WalError),
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("sync failed: {0}")]
    Sync(#[source] WalError),
    #[error("record {version} is logged but could not be applied: {source}")]
    Inconsistent { version: u64, source: StoreError },
}

impl ExecError {
    /// Whether the log and the store may now disagree.
    ///
    /// Every other error leaves both untouched and only concerns the
    /// client that issued the command.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecError::Inconsistent { .. })
    }
}
