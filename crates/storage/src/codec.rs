// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record codec
//!
//! One record body is laid out as
//!
//! ```text
//! [2B keyLen LE][2B valLen LE][key bytes][value bytes]
//! ```
//!
//! The 8-byte version that follows each record in the log is written by
//! the WAL, since versions are only known at append time.

use byteorder::{ByteOrder, LittleEndian};
use dkv_core::limits::{fits_record, MAX_FIELD_LEN};
use thiserror::Error;

/// Size of the two length prefixes
pub const LEN_PREFIX_SIZE: usize = 4;

/// Errors for record bytes that cannot be encoded or decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("{field} is {len} bytes, larger than the {MAX_FIELD_LEN} byte record limit")]
    TooLong { field: &'static str, len: usize },

    #[error("record at byte {offset} is truncated: needs {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// One logged mutation, without its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Number of bytes `encode` produces for this record
    pub fn encoded_len(&self) -> usize {
        LEN_PREFIX_SIZE + self.key.len() + self.value.len()
    }
}

/// Encode a record body
pub fn encode(record: &Record) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::with_capacity(record.encoded_len());
    encode_into(record, &mut buf)?;
    Ok(buf)
}

/// Encode a record body onto the end of `buf`
pub fn encode_into(record: &Record, buf: &mut Vec<u8>) -> Result<(), FormatError> {
    let key_len = field_len("key", &record.key)?;
    let value_len = field_len("value", &record.value)?;

    let mut prefix = [0u8; LEN_PREFIX_SIZE];
    LittleEndian::write_u16(&mut prefix[0..2], key_len);
    LittleEndian::write_u16(&mut prefix[2..4], value_len);

    buf.reserve(record.encoded_len());
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(&record.key);
    buf.extend_from_slice(&record.value);
    Ok(())
}

/// Decode the record body starting at `cursor`.
///
/// Returns the record and the number of bytes it occupied.
pub fn decode(buf: &[u8], cursor: usize) -> Result<(Record, usize), FormatError> {
    let available = buf.len().saturating_sub(cursor);
    if available < LEN_PREFIX_SIZE {
        return Err(FormatError::Truncated {
            offset: cursor,
            needed: LEN_PREFIX_SIZE,
            available,
        });
    }

    let key_len = LittleEndian::read_u16(&buf[cursor..cursor + 2]) as usize;
    let value_len = LittleEndian::read_u16(&buf[cursor + 2..cursor + 4]) as usize;
    let consumed = LEN_PREFIX_SIZE + key_len + value_len;
    if available < consumed {
        return Err(FormatError::Truncated {
            offset: cursor,
            needed: consumed,
            available,
        });
    }

    let key_start = cursor + LEN_PREFIX_SIZE;
    let value_start = key_start + key_len;
    let record = Record {
        key: buf[key_start..value_start].to_vec(),
        value: buf[value_start..value_start + value_len].to_vec(),
    };
    Ok((record, consumed))
}

fn field_len(field: &'static str, bytes: &[u8]) -> Result<u16, FormatError> {
    if !fits_record(bytes) {
        return Err(FormatError::TooLong {
            field,
            len: bytes.len(),
        });
    }
    // fits_record guarantees the length fits in a u16
    Ok(bytes.len() as u16)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
