// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command executor
//!
//! Every mutation goes through one path, serialized by the mutation lock:
//! append to the log, then apply to the store at the version the log
//! assigned. The WAL and the store keep their own locks, so readers never
//! wait on a disk write.

use crate::ExecError;
use dkv_core::{Command, Outcome, Value};
use dkv_storage::{Record, Snapshot, SnapshotStore, Store, Wal};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

/// Executes parsed commands against the store and the log
pub struct Executor {
    store: Arc<Store>,
    wal: Arc<Mutex<Wal>>,
    snapshots: SnapshotStore,
    mutation: Mutex<()>,
}

impl Executor {
    pub fn new(store: Arc<Store>, wal: Arc<Mutex<Wal>>, snapshots: SnapshotStore) -> Self {
        Self {
            store,
            wal,
            snapshots,
            mutation: Mutex::new(()),
        }
    }

    /// Execute one command
    pub fn execute(&self, command: Command) -> Result<Outcome, ExecError> {
        match command {
            Command::Set { key, value } => self.set(key, value),
            Command::Get { key } => Ok(match self.store.get(&key) {
                Some(value) => Outcome::Found(value),
                None => Outcome::NotFound,
            }),
            Command::Snapshot => self.snapshot(),
            Command::Sync => self.sync(),
        }
    }

    fn set(&self, key: String, value: String) -> Result<Outcome, ExecError> {
        let _mutation = self.lock_mutation();

        let record = Record::new(key.as_bytes(), value.as_bytes());
        let version = self.lock_wal().append(record).map_err(|e| {
            error!(key = %key, error = %e, "append failed, store left untouched");
            ExecError::Append(e)
        })?;

        if let Err(source) = self.store.apply(key, Value::String(value), version) {
            error!(version, error = %source, "logged record could not be applied");
            return Err(ExecError::Inconsistent { version, source });
        }

        // Still under the mutation lock, so no later set shows up here
        let dump = self.store.dump();
        debug!(version, "set applied");
        Ok(Outcome::Stored { version, dump })
    }

    fn snapshot(&self) -> Result<Outcome, ExecError> {
        // Hold off mutations so the map and the log copy describe the
        // same version
        let (snapshot, wal_bytes) = {
            let _mutation = self.lock_mutation();
            let (version, map) = self.store.capture();
            let wal_bytes = self
                .lock_wal()
                .read_raw()
                .map_err(ExecError::LogCapture)?;
            (Snapshot::new(version, map), wal_bytes)
        };

        let meta = self.snapshots.write(&snapshot, &wal_bytes)?;
        info!(
            "Persisted snapshot of version {} to {} ({} bytes)",
            meta.version,
            meta.snapshot_path.display(),
            meta.size_bytes
        );

        Ok(Outcome::SnapshotWritten {
            version: meta.version,
            path: meta.snapshot_path,
        })
    }

    fn sync(&self) -> Result<Outcome, ExecError> {
        let version = self.lock_wal().sync().map_err(ExecError::Sync)?;
        debug!(version, "log synced");
        Ok(Outcome::Synced { version })
    }

    fn lock_mutation(&self) -> MutexGuard<'_, ()> {
        self.mutation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_wal(&self) -> MutexGuard<'_, Wal> {
        self.wal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a reference to the store
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Get a reference to the log, e.g. for catch-up exports
    pub fn wal(&self) -> &Arc<Mutex<Wal>> {
        &self.wal
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
