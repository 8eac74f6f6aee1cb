// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catch-up command: fetch the log from a running daemon

use std::path::PathBuf;

use crate::client::{decode_catchup, fetch_catchup};
use crate::output::{print_list, OutputFormat, RecordView};

#[derive(clap::Args)]
pub struct CatchupArgs {
    /// Catch-up listener address
    #[arg(long, env = "DKV_CATCHUP_ADDR", default_value = "127.0.0.1:1025")]
    addr: String,

    /// Only fetch records newer than this version
    #[arg(long, default_value_t = 0)]
    from: u64,

    /// Write the raw stream to FILE instead of printing records
    #[arg(long, value_name = "FILE")]
    raw: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn handle(args: CatchupArgs) -> anyhow::Result<()> {
    let bytes = fetch_catchup(&args.addr, args.from).await?;

    if let Some(path) = args.raw {
        std::fs::write(&path, &bytes)?;
        eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
        return Ok(());
    }

    let log = decode_catchup(&bytes)?;
    let records: Vec<RecordView> = log.entries.iter().map(RecordView::from).collect();
    print_list(&records, args.format);
    Ok(())
}
