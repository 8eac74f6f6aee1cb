// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rebuild the store from a snapshot plus the log
//!
//! Records at or below the snapshot's version are already folded into it
//! and are skipped, so the log does not need truncating after a snapshot.

use crate::snapshot::Snapshot;
use crate::store::Store;
use crate::wal::Wal;
use dkv_core::Value;
use thiserror::Error;
use tracing::info;

/// Errors that abort a replay
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("record at version {version} has a {field} that is not valid UTF-8")]
    InvalidUtf8 { version: u64, field: &'static str },
}

/// What a replay did, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    pub snapshot_version: u64,
    pub applied: usize,
    pub skipped: usize,
    pub version: u64,
}

/// Build the initial store.
///
/// If the snapshot is newer than anything in the log, the log is told to
/// continue numbering after the snapshot's version.
pub fn build(
    snapshot: Option<Snapshot>,
    wal: &mut Wal,
) -> Result<(Store, ReplaySummary), ReplayError> {
    let Snapshot { version, mut map } = snapshot.unwrap_or_default();
    let mut summary = ReplaySummary {
        snapshot_version: version,
        version,
        ..ReplaySummary::default()
    };

    if wal.current_version() < version {
        wal.set_offset(version);
    }

    for entry in wal.entries() {
        if entry.version <= summary.version {
            summary.skipped += 1;
            continue;
        }

        let key = utf8(&entry.record.key, entry.version, "key")?;
        let value = utf8(&entry.record.value, entry.version, "value")?;
        map.insert(key, Value::String(value));
        summary.version = entry.version;
        summary.applied += 1;
    }

    info!(
        "Replayed WAL onto snapshot version {}: {} applied, {} skipped, now at version {}",
        summary.snapshot_version, summary.applied, summary.skipped, summary.version
    );

    Ok((Store::seeded(summary.version, map), summary))
}

fn utf8(bytes: &[u8], version: u64, field: &'static str) -> Result<String, ReplayError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ReplayError::InvalidUtf8 { version, field })
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
