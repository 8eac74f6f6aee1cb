// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Results of executing a command

use std::path::PathBuf;

/// A stored value.
///
/// The line protocol only produces strings, but snapshots may carry any
/// JSON scalar.
pub type Value = serde_json::Value;

/// The successful result of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A `set` was logged and applied at `version`. `dump` is the store
    /// as it stood right after the apply.
    Stored { version: u64, dump: String },
    /// A `get` found its key
    Found(Value),
    /// A `get` did not find its key
    NotFound,
    /// A snapshot of the store at `version` was written to `path`
    SnapshotWritten { version: u64, path: PathBuf },
    /// The log was flushed to stable storage through `version`
    Synced { version: u64 },
}

impl Outcome {
    /// Render a found value the way clients see it: strings verbatim,
    /// anything else as JSON.
    pub fn display_value(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
