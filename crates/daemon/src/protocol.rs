// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line protocol spoken on the command socket and the REPL
//!
//! Each command is one line. The daemon writes [`PROMPT`] before reading
//! each line and answers with one of the replies below.

use dkv_core::{Outcome, ParseError};
use dkv_engine::ExecError;

/// Written before each command is read
pub const PROMPT: &str = "#> ";

/// Reply to a `set`
pub const SET_OK: &str = "OK";
/// Reply to a `get` for a missing key
pub const NULL_DISPLAY: &str = "NULL";
/// Reply to a `snapshot`
pub const SNAPSHOT_OK: &str = "Persisted snapshot";

/// A rendered answer to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `set` succeeded; carries the store dump taken with it
    Stored { dump: String },
    Value(String),
    Null,
    Persisted,
    Synced(u64),
    Error(String),
    /// Log and store may disagree; the daemon shuts down after sending
    Fatal(String),
}

impl Reply {
    /// Build the reply for a successful command
    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Stored { dump, .. } => Reply::Stored { dump },
            Outcome::Found(value) => Reply::Value(Outcome::display_value(&value)),
            Outcome::NotFound => Reply::Null,
            Outcome::SnapshotWritten { .. } => Reply::Persisted,
            Outcome::Synced { version } => Reply::Synced(version),
        }
    }

    pub fn from_exec_error(error: &ExecError) -> Self {
        if error.is_fatal() {
            Reply::Fatal(error.to_string())
        } else {
            Reply::Error(error.to_string())
        }
    }

    pub fn from_parse_error(error: &ParseError) -> Self {
        Reply::Error(error.to_string())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Reply::Fatal(_))
    }

    /// The bytes sent to the client, newline-terminated
    pub fn render(&self) -> String {
        match self {
            Reply::Stored { dump } => format!("{}\n{}\n", SET_OK, dump),
            Reply::Value(value) => format!("{}\n", value),
            Reply::Null => format!("{}\n", NULL_DISPLAY),
            Reply::Persisted => format!("{}\n", SNAPSHOT_OK),
            Reply::Synced(version) => format!("Synced {}\n", version),
            Reply::Error(message) => format!("ERROR {}\n", message),
            Reply::Fatal(message) => format!("FATAL {}\n", message),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
