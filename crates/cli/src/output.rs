// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use std::fmt;

use clap::ValueEnum;
use dkv_storage::Entry;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// One log record as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
    pub version: u64,
    pub key: String,
    pub value: String,
}

impl From<&Entry> for RecordView {
    fn from(entry: &Entry) -> Self {
        Self {
            version: entry.version,
            key: String::from_utf8_lossy(&entry.record.key).into_owned(),
            value: String::from_utf8_lossy(&entry.record.value).into_owned(),
        }
    }
}

impl fmt::Display for RecordView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}={}", self.version, self.key, self.value)
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + fmt::Display>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            for item in items {
                println!("{}", item);
            }
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(items) {
                println!("{}", json);
            }
        }
    }
}
