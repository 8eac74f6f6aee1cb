// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios against a running daemon
//!
//! Each test starts the daemon in a temp data dir, talks to it over the
//! real command socket and catch-up listener, and restarts it where the
//! scenario needs recovery.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use dkv_daemon::lifecycle::{startup, Config, DaemonState};
use dkv_daemon::protocol::PROMPT;
use dkv_daemon::{catchup, server};
use dkv_storage::wal::{self, HEADER_SIZE};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

struct Running {
    daemon: DaemonState,
    catchup_addr: SocketAddr,
}

impl Running {
    async fn start(dir: &Path) -> Self {
        let mut config = Config::for_data_dir(dir);
        config.catchup_addr = "127.0.0.1:0".to_string();
        let mut daemon = startup(&config).await.unwrap();

        let catchup_listener = daemon.catchup_listener.take().unwrap();
        let catchup_addr = catchup_listener.local_addr().unwrap();
        tokio::spawn(catchup::serve(
            catchup_listener,
            Arc::clone(daemon.executor.wal()),
        ));
        tokio::spawn(server::serve(
            daemon.listener.take().unwrap(),
            Arc::clone(&daemon.executor),
            Arc::clone(&daemon.shutdown_requested),
        ));

        Self {
            daemon,
            catchup_addr,
        }
    }

    fn stop(mut self) {
        self.daemon.shutdown().unwrap();
    }

    async fn client(&self) -> Client {
        let stream = UnixStream::connect(&self.daemon.config.socket_path)
            .await
            .unwrap();
        let mut client = Client { stream };
        assert_eq!(client.read_until_prompt().await, "");
        client
    }

    async fn catchup(&self, request: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.catchup_addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        response
    }
}

struct Client {
    stream: UnixStream,
}

impl Client {
    async fn read_until_prompt(&mut self) -> String {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        while !buf.ends_with(PROMPT.as_bytes()) {
            let n = self.stream.read(&mut byte).await.unwrap();
            assert!(n > 0, "daemon closed the connection");
            buf.push(byte[0]);
        }
        buf.truncate(buf.len() - PROMPT.len());
        String::from_utf8(buf).unwrap()
    }

    async fn send(&mut self, line: &str) -> String {
        self.stream
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
        self.read_until_prompt().await
    }
}

#[tokio::test]
async fn set_then_get_writes_one_record() {
    let dir = TempDir::new().unwrap();
    let running = Running::start(dir.path()).await;
    let mut client = running.client().await;

    assert_eq!(
        client.send("set foo=bar").await,
        "OK\nVERSION 1\n{\"foo\":\"bar\"}\n"
    );
    assert_eq!(client.send("get foo").await, "bar\n");

    let parsed = wal::parse(&std::fs::read(dir.path().join("wal.log")).unwrap()).unwrap();
    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].version, 1);

    running.stop();
}

#[tokio::test]
async fn snapshot_then_restart_restores_state() {
    let dir = TempDir::new().unwrap();
    {
        let running = Running::start(dir.path()).await;
        let mut client = running.client().await;
        client.send("set a=1").await;
        client.send("set a=2").await;
        assert_eq!(client.send("snapshot").await, "Persisted snapshot\n");
        running.stop();
    }

    let running = Running::start(dir.path()).await;
    let mut client = running.client().await;

    assert_eq!(client.send("get a").await, "2\n");
    assert_eq!(running.daemon.executor.store().version(), 2);
    assert!(client.send("set b=3").await.starts_with("OK\nVERSION 3\n"));

    running.stop();
}

#[tokio::test]
async fn restart_without_snapshot_replays_log() {
    let dir = TempDir::new().unwrap();
    {
        let running = Running::start(dir.path()).await;
        let mut client = running.client().await;
        client.send("set x=1").await;
        client.send("set y=2").await;
        running.stop();
    }

    let running = Running::start(dir.path()).await;
    let mut client = running.client().await;

    assert_eq!(client.send("get x").await, "1\n");
    assert_eq!(client.send("get y").await, "2\n");

    running.stop();
}

#[tokio::test]
async fn missing_key_is_null() {
    let dir = TempDir::new().unwrap();
    let running = Running::start(dir.path()).await;
    let mut client = running.client().await;

    assert_eq!(client.send("get missing_key").await, "NULL\n");

    running.stop();
}

#[tokio::test]
async fn catchup_streams_whole_log() {
    let dir = TempDir::new().unwrap();
    let running = Running::start(dir.path()).await;
    let mut client = running.client().await;
    client.send("set a=1").await;
    client.send("set key=value").await;

    let response = running.catchup(b"C0").await;

    let records = (4 + 1 + 1 + 8) + (4 + 3 + 5 + 8);
    assert_eq!(response.len(), HEADER_SIZE + records);
    assert_eq!(response, std::fs::read(dir.path().join("wal.log")).unwrap());

    running.stop();
}

#[tokio::test]
async fn catchup_resumes_after_version() {
    let dir = TempDir::new().unwrap();
    let running = Running::start(dir.path()).await;
    let mut client = running.client().await;
    client.send("set a=1").await;
    client.send("set b=2").await;
    client.send("set c=3").await;

    let parsed = wal::parse(&running.catchup(b"C2").await).unwrap();

    let versions: Vec<u64> = parsed.entries.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![3]);

    running.stop();
}

#[tokio::test]
async fn bad_catchup_request_gets_error_text() {
    let dir = TempDir::new().unwrap();
    let running = Running::start(dir.path()).await;

    let response = running.catchup(b"Xyz").await;

    assert_eq!(response, catchup::INVALID_REQUEST.as_bytes());

    running.stop();
}

#[tokio::test]
async fn concurrent_clients_share_one_version_sequence() {
    let dir = TempDir::new().unwrap();
    let running = Running::start(dir.path()).await;

    let mut tasks = Vec::new();
    for c in 0..4 {
        let mut client = running.client().await;
        tasks.push(tokio::spawn(async move {
            for i in 0..10 {
                let reply = client.send(&format!("set c{}={}", c, i)).await;
                assert!(reply.starts_with("OK\n"), "unexpected reply {:?}", reply);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(running.daemon.executor.store().version(), 40);
    let parsed = wal::parse(&std::fs::read(dir.path().join("wal.log")).unwrap()).unwrap();
    let versions: Vec<u64> = parsed.entries.iter().map(|e| e.version).collect();
    assert_eq!(versions, (1..=40).collect::<Vec<_>>());

    running.stop();
}
