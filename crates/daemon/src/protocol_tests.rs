// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use dkv_core::parse;
use dkv_storage::{Store, StoreError, WalError};
use serde_json::json;
use std::path::PathBuf;

#[test]
fn stored_reply_dumps_store() {
    let store = Store::new();
    store.apply("foo".to_string(), json!("bar"), 1).unwrap();

    let reply = Reply::from_outcome(Outcome::Stored {
        version: 1,
        dump: store.dump(),
    });

    assert_eq!(reply.render(), "OK\nVERSION 1\n{\"foo\":\"bar\"}\n");
}

#[test]
fn found_string_is_raw() {
    let reply = Reply::from_outcome(Outcome::Found(json!("bar")));
    assert_eq!(reply.render(), "bar\n");
}

#[test]
fn found_number_is_json() {
    let reply = Reply::from_outcome(Outcome::Found(json!(42)));
    assert_eq!(reply.render(), "42\n");
}

#[test]
fn not_found_is_null() {
    let reply = Reply::from_outcome(Outcome::NotFound);
    assert_eq!(reply.render(), "NULL\n");
}

#[test]
fn snapshot_reply() {
    let reply = Reply::from_outcome(Outcome::SnapshotWritten {
        version: 3,
        path: PathBuf::from("snapshot/1_store.snapshot"),
    });
    assert_eq!(reply.render(), "Persisted snapshot\n");
}

#[test]
fn sync_reply_carries_version() {
    let reply = Reply::from_outcome(Outcome::Synced { version: 7 });
    assert_eq!(reply.render(), "Synced 7\n");
}

#[test]
fn parse_error_reply() {
    let err = parse("frobnicate").unwrap_err();
    let rendered = Reply::from_parse_error(&err).render();

    assert!(rendered.starts_with("ERROR unrecognized command (are you missing arguments?)"));
    assert!(rendered.ends_with('\n'));
}

#[test]
fn append_failure_is_plain_error() {
    let err = ExecError::Append(WalError::Io(std::io::Error::other("disk full")));
    let reply = Reply::from_exec_error(&err);

    assert!(!reply.is_fatal());
    assert!(reply.render().starts_with("ERROR append failed"));
}

#[test]
fn inconsistency_is_fatal() {
    let err = ExecError::Inconsistent {
        version: 4,
        source: StoreError::VersionRegression {
            current: 9,
            attempted: 4,
        },
    };
    let reply = Reply::from_exec_error(&err);

    assert!(reply.is_fatal());
    assert!(reply.render().starts_with("FATAL record 4"));
}
