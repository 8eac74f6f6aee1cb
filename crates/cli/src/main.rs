// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dkv - client for the dkv key-value daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{catchup, kv};

#[derive(Parser)]
#[command(name = "dkv", version, about = "dkv - durable key-value store client")]
struct Cli {
    /// Command socket of the daemon
    #[arg(long, global = true, env = "DKV_SOCKET", default_value = "dkvd.sock")]
    sock: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Kv(kv::KvCommand),
    /// Fetch the log from the catch-up listener
    Catchup(catchup::CatchupArgs),
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Kv(command) => kv::handle(command, &cli.sock).await,
        Commands::Catchup(args) => catchup::handle(args).await,
    }
}
