// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command socket server and the session loop it shares with the REPL.

use std::sync::Arc;

use dkv_core::{parse, MAX_FIELD_LEN};
use dkv_engine::Executor;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error};

use crate::protocol::{Reply, PROMPT};

/// Longest command line accepted: a `set` with both fields at their limit
pub const MAX_LINE_LEN: usize = 2 * MAX_FIELD_LEN + 16;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed its side
    Eof,
    /// A fatal reply was sent and shutdown was requested
    Fatal,
}

/// Accept connections until the listener fails, one task per client
pub async fn serve(listener: UnixListener, executor: Arc<Executor>, shutdown: Arc<Notify>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                debug!("Accepted command connection");
                let executor = Arc::clone(&executor);
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, executor, shutdown).await {
                        error!("Error handling connection: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

/// Handle a single client connection
pub async fn handle_connection(
    stream: UnixStream,
    executor: Arc<Executor>,
    shutdown: Arc<Notify>,
) -> Result<SessionEnd, ServerError> {
    let (reader, writer) = stream.into_split();
    run_session(BufReader::new(reader), writer, executor, shutdown).await
}

/// Read commands line by line and answer each one.
///
/// Blank lines are skipped. Returns at EOF, or after a fatal reply, in
/// which case `shutdown` has been notified.
pub async fn run_session<R, W>(
    mut reader: R,
    mut writer: W,
    executor: Arc<Executor>,
    shutdown: Arc<Notify>,
) -> Result<SessionEnd, ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let reply = match read_line(&mut reader, &mut buf).await? {
            Incoming::Eof => {
                debug!("Client disconnected");
                return Ok(SessionEnd::Eof);
            }
            Incoming::Line(line) if line.trim().is_empty() => continue,
            Incoming::Line(line) => execute_line(&line, &executor).await?,
            Incoming::Rejected(message) => {
                debug!("Rejected input: {}", message);
                Reply::Error(message)
            }
        };
        writer.write_all(reply.render().as_bytes()).await?;
        writer.flush().await?;

        if reply.is_fatal() {
            error!("Fatal inconsistency, requesting shutdown");
            shutdown.notify_one();
            return Ok(SessionEnd::Fatal);
        }
    }
}

enum Incoming {
    Eof,
    Line(String),
    /// Input that cannot be a command; the rest of its line was dropped
    Rejected(String),
}

/// Read one line of at most [`MAX_LINE_LEN`] bytes
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Incoming>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_LINE_LEN as u64 + 1;
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(Incoming::Eof);
    }

    if buf.len() > MAX_LINE_LEN && buf.last() != Some(&b'\n') {
        discard_line(reader).await?;
        return Ok(Incoming::Rejected(format!(
            "command longer than {} bytes",
            MAX_LINE_LEN
        )));
    }

    Ok(match std::str::from_utf8(buf) {
        Ok(line) => Incoming::Line(line.to_string()),
        Err(_) => Incoming::Rejected("command is not valid UTF-8".to_string()),
    })
}

/// Skip input up to and including the next newline
async fn discard_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        let (used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}

/// Parse and run one command line
pub async fn execute_line(line: &str, executor: &Arc<Executor>) -> Result<Reply, ServerError> {
    let command = match parse(line) {
        Ok(command) => command,
        Err(e) => {
            debug!("Rejected command: {}", e);
            return Ok(Reply::from_parse_error(&e));
        }
    };

    let worker = Arc::clone(executor);
    // File I/O and lock waits stay off the async workers
    let result = tokio::task::spawn_blocking(move || worker.execute(command)).await?;

    Ok(match result {
        Ok(outcome) => {
            debug!(?outcome, "command executed");
            Reply::from_outcome(outcome)
        }
        Err(e) => {
            error!("Command failed: {}", e);
            Reply::from_exec_error(&e)
        }
    })
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Executor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
