// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dkv_storage::{wal, StoreError};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn open(dir: &Path) -> Executor {
    let snapshots = SnapshotStore::new(&dir.join("snapshot"));
    let snapshot = snapshots
        .find_newest()
        .unwrap()
        .map(|handle| snapshots.read(&handle).unwrap());
    let mut wal = Wal::open_or_create(&dir.join("wal.log")).unwrap();
    let (store, _) = dkv_storage::build(snapshot, &mut wal).unwrap();

    Executor::new(Arc::new(store), Arc::new(Mutex::new(wal)), snapshots)
}

fn setup() -> (TempDir, Executor) {
    let dir = tempdir().unwrap();
    let executor = open(dir.path());
    (dir, executor)
}

fn set(key: &str, value: &str) -> Command {
    Command::Set {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn get(key: &str) -> Command {
    Command::Get {
        key: key.to_string(),
    }
}

#[test]
fn set_then_get_logs_one_record() {
    let (dir, executor) = setup();

    let stored = executor.execute(set("foo", "bar")).unwrap();
    let found = executor.execute(get("foo")).unwrap();

    assert_eq!(
        stored,
        Outcome::Stored {
            version: 1,
            dump: "VERSION 1\n{\"foo\":\"bar\"}".to_string(),
        }
    );
    assert_eq!(found, Outcome::Found(json!("bar")));

    let parsed = wal::parse(&std::fs::read(dir.path().join("wal.log")).unwrap()).unwrap();
    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].version, 1);
    assert_eq!(parsed.entries[0].record, Record::new("foo", "bar"));
}

#[test]
fn get_missing_key_is_not_found() {
    let (_dir, executor) = setup();

    assert_eq!(
        executor.execute(get("missing_key")).unwrap(),
        Outcome::NotFound
    );
}

#[test]
fn snapshot_survives_restart() {
    let dir = tempdir().unwrap();
    {
        let executor = open(dir.path());
        executor.execute(set("a", "1")).unwrap();
        executor.execute(set("a", "2")).unwrap();
        let outcome = executor.execute(Command::Snapshot).unwrap();
        assert!(matches!(
            outcome,
            Outcome::SnapshotWritten { version: 2, .. }
        ));
    }

    let executor = open(dir.path());

    assert_eq!(executor.execute(get("a")).unwrap(), Outcome::Found(json!("2")));
    assert_eq!(executor.store().version(), 2);
    assert!(matches!(
        executor.execute(set("b", "3")).unwrap(),
        Outcome::Stored { version: 3, .. }
    ));
}

#[test]
fn snapshot_writes_matching_log_copy() {
    let (dir, executor) = setup();
    executor.execute(set("k", "v")).unwrap();

    let Outcome::SnapshotWritten { path, .. } = executor.execute(Command::Snapshot).unwrap() else {
        panic!("expected a snapshot outcome");
    };

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    let ts = name.strip_suffix("_store.snapshot").unwrap();
    let copy = path.with_file_name(format!("{ts}_wal.log"));
    assert_eq!(
        std::fs::read(copy).unwrap(),
        std::fs::read(dir.path().join("wal.log")).unwrap()
    );
}

#[test]
fn sync_reports_durable_version() {
    let (_dir, executor) = setup();
    executor.execute(set("a", "1")).unwrap();
    executor.execute(set("b", "2")).unwrap();

    assert_eq!(
        executor.execute(Command::Sync).unwrap(),
        Outcome::Synced { version: 2 }
    );
}

#[test]
fn concurrent_sets_get_distinct_ordered_versions() {
    let (_dir, executor) = setup();
    let executor = Arc::new(executor);

    let workers: Vec<_> = (0..8)
        .map(|t| {
            let executor = Arc::clone(&executor);
            std::thread::spawn(move || {
                (0..25)
                    .map(|i| match executor.execute(set(&format!("k{t}"), &i.to_string())) {
                        Ok(Outcome::Stored { version, dump }) => {
                            // The dump belongs to this set, not a later one
                            assert!(dump.starts_with(&format!("VERSION {version}\n")));
                            version
                        }
                        other => panic!("unexpected {:?}", other),
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut versions: Vec<u64> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    versions.sort_unstable();

    assert_eq!(versions, (1..=200).collect::<Vec<_>>());
    assert_eq!(executor.store().version(), 200);
    for t in 0..8 {
        assert_eq!(
            executor.execute(get(&format!("k{t}"))).unwrap(),
            Outcome::Found(json!("24"))
        );
    }

    let wal = executor.wal().lock().unwrap();
    assert!(wal.entries().windows(2).all(|w| w[0].version < w[1].version));
}

#[test]
fn store_ahead_of_log_is_fatal() {
    let dir = tempdir().unwrap();
    let wal = Wal::open_or_create(&dir.path().join("wal.log")).unwrap();
    let store = Store::seeded(10, BTreeMap::new());
    let executor = Executor::new(
        Arc::new(store),
        Arc::new(Mutex::new(wal)),
        SnapshotStore::new(&dir.path().join("snapshot")),
    );

    let err = executor.execute(set("k", "v")).unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(
        err,
        ExecError::Inconsistent {
            version: 1,
            source: StoreError::VersionRegression {
                current: 10,
                attempted: 1
            }
        }
    ));
    assert_eq!(executor.store().get("k"), None);
}

#[test]
fn io_errors_are_not_fatal() {
    let err = ExecError::Sync(dkv_storage::WalError::Io(std::io::Error::other("disk")));
    assert!(!err.is_fatal());
}
