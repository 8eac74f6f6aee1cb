// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clients for the daemon's command socket and catch-up listener

use std::path::{Path, PathBuf};
use std::time::Duration;

use dkv_storage::wal::{self, ParsedLog, MAGIC};
use dkv_storage::WalError;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};
use tracing::debug;

/// Prompt the daemon writes before reading each command
pub const PROMPT: &str = "#> ";

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for each exchange with the daemon
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("DKV_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running (no socket at {0})")]
    DaemonNotRunning(PathBuf),

    #[error("Timed out waiting for the daemon")]
    Timeout,

    #[error("Connection closed before the reply was complete")]
    ConnectionClosed,

    #[error("{0}")]
    Rejected(String),

    #[error("daemon reported a fatal inconsistency: {0}")]
    Fatal(String),

    #[error("catch-up refused: {0}")]
    CatchupRefused(String),

    #[error("catch-up stream is not a valid log: {0}")]
    Wal(#[from] WalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for the line-oriented command socket
pub struct CommandClient {
    socket_path: PathBuf,
}

impl CommandClient {
    /// Connect to a running daemon
    pub fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning(socket_path.to_path_buf()));
        }
        Ok(Self {
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Send one command line and return the reply without the trailing
    /// prompt. `ERROR` and `FATAL` replies become errors.
    pub async fn exec(&self, line: &str) -> Result<String, ClientError> {
        let timeout = timeout_ipc();
        tokio::time::timeout(timeout, self.exec_inner(line))
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    async fn exec_inner(&self, line: &str) -> Result<String, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;

        read_until_prompt(&mut stream).await?;
        debug!("sending {:?}", line);
        stream
            .write_all(format!("{}\n", line.trim()).as_bytes())
            .await?;
        let reply = read_until_prompt(&mut stream).await?;

        classify_reply(reply)
    }
}

/// Read until the prompt, returning what came before it
pub async fn read_until_prompt<R>(reader: &mut R) -> Result<String, ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.ends_with(PROMPT.as_bytes()) {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    buf.truncate(buf.len() - PROMPT.len());
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Turn `ERROR`/`FATAL` replies into errors
pub fn classify_reply(reply: String) -> Result<String, ClientError> {
    if let Some(message) = reply.strip_prefix("ERROR ") {
        return Err(ClientError::Rejected(message.trim_end().to_string()));
    }
    if let Some(message) = reply.strip_prefix("FATAL ") {
        return Err(ClientError::Fatal(message.trim_end().to_string()));
    }
    Ok(reply)
}

/// Request the log from the catch-up listener, starting after `from`.
///
/// Returns the raw stream, checked to start with the log header.
pub async fn fetch_catchup(addr: &str, from: u64) -> Result<Vec<u8>, ClientError> {
    let timeout = timeout_ipc();
    tokio::time::timeout(timeout, fetch_catchup_inner(addr, from))
        .await
        .map_err(|_| ClientError::Timeout)?
}

async fn fetch_catchup_inner(addr: &str, from: u64) -> Result<Vec<u8>, ClientError> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(format!("C{}", from).as_bytes()).await?;

    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).await?;
    debug!("received {} catch-up bytes from {}", bytes.len(), addr);

    check_catchup_stream(bytes)
}

/// A refused request comes back as text, which never starts with the
/// log's magic number
pub fn check_catchup_stream(bytes: Vec<u8>) -> Result<Vec<u8>, ClientError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC.to_le_bytes() {
        return Err(ClientError::CatchupRefused(
            String::from_utf8_lossy(&bytes).trim().to_string(),
        ));
    }
    Ok(bytes)
}

/// Decode a catch-up stream
pub fn decode_catchup(bytes: &[u8]) -> Result<ParsedLog, ClientError> {
    Ok(wal::parse(bytes)?)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
