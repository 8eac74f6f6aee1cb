// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands sent over the command socket

use std::path::Path;

use clap::Subcommand;

use crate::client::CommandClient;

#[derive(Subcommand)]
pub enum KvCommand {
    /// Store a value
    Set {
        key: String,
        value: String,
    },
    /// Look up a key (prints NULL if absent)
    Get { key: String },
    /// Write a snapshot of the store
    Snapshot,
    /// Flush the log to stable storage
    Sync,
    /// Send a raw command line
    Exec {
        #[arg(required = true, num_args = 1..)]
        line: Vec<String>,
    },
}

impl KvCommand {
    /// The protocol line for this command
    pub fn to_line(&self) -> String {
        match self {
            KvCommand::Set { key, value } => format!("set {}={}", key, value),
            KvCommand::Get { key } => format!("get {}", key),
            KvCommand::Snapshot => "snapshot".to_string(),
            KvCommand::Sync => "sync".to_string(),
            KvCommand::Exec { line } => line.join(" "),
        }
    }
}

pub async fn handle(command: KvCommand, socket_path: &Path) -> anyhow::Result<()> {
    let client = CommandClient::connect(socket_path)?;
    let reply = client.exec(&command.to_line()).await?;
    print!("{}", reply);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        set = { KvCommand::Set { key: "a".into(), value: "b c".into() }, "set a=b c" },
        get = { KvCommand::Get { key: "a".into() }, "get a" },
        snapshot = { KvCommand::Snapshot, "snapshot" },
        sync = { KvCommand::Sync, "sync" },
        exec = { KvCommand::Exec { line: vec!["set".into(), "x=1".into()] }, "set x=1" },
    )]
    fn command_lines(command: KvCommand, expected: &str) {
        assert_eq!(command.to_line(), expected);
    }
}
