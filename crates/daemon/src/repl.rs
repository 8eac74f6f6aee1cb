// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive front-end on stdin/stdout

use std::sync::Arc;

use dkv_engine::Executor;
use tokio::io::BufReader;
use tokio::sync::Notify;
use tracing::info;

use crate::server::{run_session, ServerError, SessionEnd};

/// Serve commands from stdin until EOF or a fatal reply
pub async fn run(
    executor: Arc<Executor>,
    shutdown: Arc<Notify>,
) -> Result<SessionEnd, ServerError> {
    info!("Serving commands on stdin");
    let end = run_session(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        executor,
        shutdown,
    )
    .await?;
    info!("REPL session ended: {:?}", end);
    Ok(end)
}
