// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory key-value state
//!
//! The map and its version sit behind one reader/writer lock: lookups share
//! it, mutations take it exclusively. No method holds the lock across I/O.

use dkv_core::Value;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// Errors raised when a mutation would break the store's invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("version regression: store is at {current}, refusing to apply {attempted}")]
    VersionRegression { current: u64, attempted: u64 },
}

#[derive(Debug, Default)]
struct StoreState {
    map: BTreeMap<String, Value>,
    version: u64,
}

/// The live key-value map plus the version of the last applied record
#[derive(Debug, Default)]
pub struct Store {
    state: RwLock<StoreState>,
}

impl Store {
    /// An empty store at version 0
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with `map` at `version`
    pub fn seeded(version: u64, map: BTreeMap<String, Value>) -> Self {
        Self {
            state: RwLock::new(StoreState { map, version }),
        }
    }

    /// Look up a key. `None` means not found, which is distinct from an
    /// empty string value.
    pub fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.map.get(key).cloned()
    }

    /// Version of the last applied record
    pub fn version(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .version
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a logged mutation and advance the version to the one the log
    /// assigned it.
    ///
    /// Only the command executor calls this, after the record is in the
    /// log. A version that does not move forward is refused.
    pub fn apply(&self, key: String, value: Value, version: u64) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if version <= state.version {
            return Err(StoreError::VersionRegression {
                current: state.version,
                attempted: version,
            });
        }
        state.map.insert(key, value);
        state.version = version;
        Ok(())
    }

    /// A consistent copy of the version and map
    pub fn capture(&self) -> (u64, BTreeMap<String, Value>) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (state.version, state.map.clone())
    }

    /// Human-readable dump: a `VERSION <n>` line, then the map as JSON
    pub fn dump(&self) -> String {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let json = serde_json::to_string(&state.map).unwrap_or_else(|_| "{}".to_string());
        format!("VERSION {}\n{}", state.version, json)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
