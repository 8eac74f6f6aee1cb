// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot management
//!
//! A snapshot captures the whole key-value map and the version it
//! represents:
//!
//! ```text
//! snapshot/<unix-ts>_store.snapshot   [8B version LE][JSON object]
//! snapshot/<unix-ts>_wal.log          verbatim copy of the log
//! ```
//!
//! Only the store file is read back on startup; the log copy is kept for
//! inspection.

use byteorder::{ByteOrder, LittleEndian};
use dkv_core::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

const STORE_SUFFIX: &str = "_store.snapshot";
const WAL_SUFFIX: &str = "_wal.log";
const SNAPSHOT_EXTENSION: &str = "snapshot";
const VERSION_PREFIX_SIZE: usize = 8;

/// Errors that can occur during snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot {path} is corrupt: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A point-in-time copy of the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub map: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn new(version: u64, map: BTreeMap<String, Value>) -> Self {
        Self { version, map }
    }

    /// Serialize as `[8B version LE][JSON map]`
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let json = serde_json::to_vec(&self.map)?;
        let mut out = vec![0u8; VERSION_PREFIX_SIZE];
        LittleEndian::write_u64(&mut out, self.version);
        out.extend(json);
        Ok(out)
    }

    /// Inverse of [`Snapshot::encode`]; `path` is only used in errors
    pub fn decode(bytes: &[u8], path: &Path) -> Result<Self, SnapshotError> {
        if bytes.len() < VERSION_PREFIX_SIZE {
            return Err(SnapshotError::CorruptSnapshot {
                path: path.to_path_buf(),
                reason: format!("only {} bytes, missing version prefix", bytes.len()),
            });
        }

        let version = LittleEndian::read_u64(&bytes[..VERSION_PREFIX_SIZE]);
        let map = serde_json::from_slice(&bytes[VERSION_PREFIX_SIZE..]).map_err(|e| {
            SnapshotError::CorruptSnapshot {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self { version, map })
    }
}

/// A snapshot file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    pub path: PathBuf,
    /// Unix timestamp embedded in the file name
    pub id: u64,
    pub modified: SystemTime,
}

/// Files produced by one [`SnapshotStore::write`]
#[derive(Debug, Clone)]
pub struct SnapshotMeta {
    pub id: u64,
    pub version: u64,
    pub snapshot_path: PathBuf,
    pub wal_copy_path: PathBuf,
    pub size_bytes: u64,
}

/// Manages snapshot creation and discovery in one directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a snapshot named after the current time, plus a copy of the
    /// log bytes it corresponds to.
    pub fn write(
        &self,
        snapshot: &Snapshot,
        wal_bytes: &[u8],
    ) -> Result<SnapshotMeta, SnapshotError> {
        let id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.write_with_id(snapshot, wal_bytes, id)
    }

    /// Write a snapshot with an explicit timestamp id
    pub fn write_with_id(
        &self,
        snapshot: &Snapshot,
        wal_bytes: &[u8],
        id: u64,
    ) -> Result<SnapshotMeta, SnapshotError> {
        fs::create_dir_all(&self.dir)?;

        let snapshot_path = self.dir.join(format!("{}{}", id, STORE_SUFFIX));
        let wal_copy_path = self.dir.join(format!("{}{}", id, WAL_SUFFIX));

        let bytes = snapshot.encode()?;
        write_atomic(&snapshot_path, &bytes)?;
        write_atomic(&wal_copy_path, wal_bytes)?;

        info!(
            "Wrote snapshot {} at version {} ({} keys)",
            snapshot_path.display(),
            snapshot.version,
            snapshot.map.len()
        );

        Ok(SnapshotMeta {
            id,
            version: snapshot.version,
            snapshot_path,
            wal_copy_path,
            size_bytes: bytes.len() as u64,
        })
    }

    /// All snapshot files, oldest first by modification time
    pub fn list(&self) -> Result<Vec<SnapshotHandle>, SnapshotError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut handles = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == SNAPSHOT_EXTENSION) != Some(true) {
                continue;
            }
            let Some(id) = parse_id(&path) else {
                debug!("Ignoring unrecognized snapshot file {}", path.display());
                continue;
            };
            let modified = fs::metadata(&path)?.modified()?;
            handles.push(SnapshotHandle { path, id, modified });
        }

        // Same-second writes share an mtime on coarse filesystems
        handles.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.id.cmp(&b.id)));
        Ok(handles)
    }

    /// The most recently modified snapshot, if any
    pub fn find_newest(&self) -> Result<Option<SnapshotHandle>, SnapshotError> {
        Ok(self.list()?.pop())
    }

    /// Load a snapshot file
    pub fn read(&self, handle: &SnapshotHandle) -> Result<Snapshot, SnapshotError> {
        let bytes = fs::read(&handle.path)?;
        Snapshot::decode(&bytes, &handle.path)
    }
}

fn parse_id(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(STORE_SUFFIX)?.parse().ok()
}

/// Write via a temp file and rename so readers never see a partial file
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
