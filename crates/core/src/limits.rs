// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Size limits imposed by the record format.

/// Largest key or value, in bytes, that a log record can hold.
///
/// Record lengths are stored as 2-byte unsigned integers, so anything
/// longer cannot be represented on disk.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// Check that a field fits in a log record.
pub fn fits_record(field: &[u8]) -> bool {
    field.len() <= MAX_FIELD_LEN
}
