// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dkv storage: write-ahead log, snapshots and the in-memory store

pub mod codec;
mod replay;
pub mod snapshot;
mod store;
pub mod wal;

pub use codec::{FormatError, Record};
pub use replay::{build, ReplayError, ReplaySummary};
pub use snapshot::{Snapshot, SnapshotError, SnapshotHandle, SnapshotMeta, SnapshotStore};
pub use store::{Store, StoreError};
pub use wal::{Entry, ParsedLog, SyncMode, Wal, WalError};
