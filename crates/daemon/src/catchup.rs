// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catch-up server
//!
//! A follower connects over TCP and sends `C<version>`. It gets back the
//! log header followed by every record newer than `version`, copied
//! byte-for-byte from the log file, and the connection closes. A bare `C`
//! asks for the whole log.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dkv_storage::{Wal, WalError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Request tag for a catch-up
pub const REQUEST_TAG: u8 = b'C';
/// Largest request read from a connection
pub const MAX_REQUEST_LEN: usize = 256;
/// How long a client has to send its request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Sent back for any request that is not `C<digits>`
pub const INVALID_REQUEST: &str = "invalid catchup request. 'C<VERSION>'";
/// Sent back when the log could not be read
pub const EXPORT_FAILED: &str = "unexpected error";

/// Catch-up errors
#[derive(Debug, Error)]
pub enum CatchupError {
    #[error("invalid catchup request")]
    InvalidRequest,

    #[error("request read timeout")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("export task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Parse a request into the version to resume after.
///
/// Only ASCII whitespace may follow the digits.
pub fn parse_request(request: &[u8]) -> Result<u64, CatchupError> {
    let Some((&REQUEST_TAG, rest)) = request.split_first() else {
        return Err(CatchupError::InvalidRequest);
    };

    let digits_len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    let (digits, trailer) = rest.split_at(digits_len);
    if !trailer.iter().all(u8::is_ascii_whitespace) {
        return Err(CatchupError::InvalidRequest);
    }
    if digits.is_empty() {
        return Ok(0);
    }

    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CatchupError::InvalidRequest)
}

/// Accept catch-up connections, one task per request
pub async fn serve(listener: TcpListener, wal: Arc<Mutex<Wal>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("Accepted catch-up request from {}", peer);
                let wal = Arc::clone(&wal);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, wal).await {
                        warn!("Catch-up from {} failed: {}", peer, e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting catch-up connection: {}", e);
            }
        }
    }
}

/// Answer one catch-up request and close the stream
pub async fn handle_connection<S>(mut stream: S, wal: Arc<Mutex<Wal>>) -> Result<u64, CatchupError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; MAX_REQUEST_LEN];
    let n = tokio::time::timeout(REQUEST_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| CatchupError::Timeout)??;

    let version = match parse_request(&buf[..n]) {
        Ok(version) => version,
        Err(e) => {
            debug!(
                "Rejecting catch-up request {:?}",
                String::from_utf8_lossy(&buf[..n])
            );
            stream.write_all(INVALID_REQUEST.as_bytes()).await?;
            stream.shutdown().await?;
            return Err(e);
        }
    };

    // Taken under the WAL lock, so no half-written record is included
    let export = tokio::task::spawn_blocking(move || {
        let wal = wal.lock().unwrap_or_else(|e| e.into_inner());
        wal.export_since(version)
    })
    .await;
    let bytes = match export
        .map_err(CatchupError::from)
        .and_then(|r| r.map_err(CatchupError::from))
    {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to export WAL: {}", e);
            stream.write_all(EXPORT_FAILED.as_bytes()).await?;
            stream.shutdown().await?;
            return Err(e);
        }
    };

    info!(
        "Streaming {} bytes of WAL after version {}",
        bytes.len(),
        version
    );
    stream.write_all(&bytes).await?;
    stream.shutdown().await?;
    Ok(version)
}

#[cfg(test)]
#[path = "catchup_tests.rs"]
mod tests;
