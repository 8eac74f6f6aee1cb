// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dkv-core: command model shared by the dkv store crates
//!
//! This crate provides:
//! - The parsed `Command` consumed by the executor
//! - The line-command parser used by every front-end
//! - The `Outcome` a successful command produces
//! - Field size limits imposed by the on-disk record format

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod command;
pub mod limits;
pub mod outcome;

pub use command::{parse, Command, ParseError};
pub use limits::MAX_FIELD_LEN;
pub use outcome::{Outcome, Value};
