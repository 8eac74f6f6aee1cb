// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented command parsing
//!
//! Turns one line of client input into a [`Command`]:
//!
//! ```text
//! set <key>=<value>
//! get <key>
//! snapshot
//! sync
//! ```

use crate::limits::{fits_record, MAX_FIELD_LEN};
use thiserror::Error;

const PREFIX_SET: &str = "set ";
const PREFIX_GET: &str = "get ";
const KEYWORD_SNAPSHOT: &str = "snapshot";
const KEYWORD_SYNC: &str = "sync";

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `value` under `key`
    Set { key: String, value: String },
    /// Look up `key`
    Get { key: String },
    /// Write a snapshot of the store
    Snapshot,
    /// Flush the log to stable storage
    Sync,
}

/// Errors produced for unparseable client input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unrecognized command (are you missing arguments?): '{0}'")]
    Unrecognized(String),

    #[error("malformed set command (expected key=value): '{0}'")]
    MalformedSet(String),

    #[error("keys and vals must not be empty")]
    EmptyField,

    #[error("{field} is {len} bytes, the limit is {MAX_FIELD_LEN}")]
    TooLong { field: &'static str, len: usize },

    #[error("{0} does not take arguments")]
    UnexpectedArgs(&'static str),
}

/// Parse one line of input into a command.
///
/// Leading and trailing whitespace is ignored, as is whitespace around
/// keys and values.
pub fn parse(raw: &str) -> Result<Command, ParseError> {
    let raw = raw.trim();

    if let Some(rest) = raw.strip_prefix(PREFIX_SET) {
        return parse_set(rest);
    }
    if let Some(rest) = raw.strip_prefix(PREFIX_GET) {
        return parse_get(rest);
    }
    if let Some(rest) = raw.strip_prefix(KEYWORD_SNAPSHOT) {
        return no_args(rest, KEYWORD_SNAPSHOT, Command::Snapshot, raw);
    }
    if let Some(rest) = raw.strip_prefix(KEYWORD_SYNC) {
        return no_args(rest, KEYWORD_SYNC, Command::Sync, raw);
    }

    Err(ParseError::Unrecognized(raw.to_string()))
}

fn parse_set(rest: &str) -> Result<Command, ParseError> {
    let Some((key, value)) = rest.split_once('=') else {
        return Err(ParseError::MalformedSet(rest.trim().to_string()));
    };

    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return Err(ParseError::EmptyField);
    }
    check_len("key", key)?;
    check_len("value", value)?;

    Ok(Command::Set {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_get(rest: &str) -> Result<Command, ParseError> {
    let key = rest.trim();
    if key.is_empty() {
        return Err(ParseError::EmptyField);
    }
    check_len("key", key)?;

    Ok(Command::Get {
        key: key.to_string(),
    })
}

fn no_args(
    rest: &str,
    keyword: &'static str,
    command: Command,
    raw: &str,
) -> Result<Command, ParseError> {
    if rest.is_empty() {
        Ok(command)
    } else if rest.starts_with(char::is_whitespace) {
        Err(ParseError::UnexpectedArgs(keyword))
    } else {
        // "snapshots", "syncing" etc. are different words entirely
        Err(ParseError::Unrecognized(raw.to_string()))
    }
}

fn check_len(field: &'static str, s: &str) -> Result<(), ParseError> {
    if fits_record(s.as_bytes()) {
        Ok(())
    } else {
        Err(ParseError::TooLong {
            field,
            len: s.len(),
        })
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
