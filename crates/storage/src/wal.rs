// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage
//!
//! ## File layout
//!
//! ```text
//! [4B magic 0x33AA33AA][8B base version]
//! [2B keyLen][2B valLen][key][value][8B version]   (repeated)
//! ```
//!
//! All integers are little-endian. Versions strictly increase in file
//! order; opening a log that breaks this is an error.

use crate::codec::{self, FormatError, Record};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Magic number at the start of every log file
pub const MAGIC: u32 = 0x33AA_33AA;
/// Magic number plus base version
pub const HEADER_SIZE: usize = 12;
/// Size of the version suffix after each record body
pub const VERSION_SIZE: usize = 8;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt log: {0}")]
    CorruptLog(String),

    #[error("non-monotonic version at byte {offset}: {found} follows {previous}")]
    NonMonotonicVersion {
        offset: usize,
        previous: u64,
        found: u64,
    },

    #[error("record format error: {0}")]
    Format(#[from] FormatError),

    #[error("no version left after {0}")]
    VersionExhausted(u64),

    #[error("log {} has unacknowledged bytes from a failed append", .0.display())]
    Unwritable(PathBuf),
}

/// Whether appends wait for the data to reach stable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// `sync_data` after every append
    #[default]
    Always,
    /// Leave flushing to the OS (or an explicit [`Wal::sync`])
    Never,
}

/// A record together with the version the log assigned it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub record: Record,
    pub version: u64,
}

impl Entry {
    /// Bytes this entry occupies in the log file
    pub fn encoded_len(&self) -> usize {
        self.record.encoded_len() + VERSION_SIZE
    }
}

/// The decoded contents of a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLog {
    pub base_version: u64,
    pub entries: Vec<Entry>,
}

/// Encode the file header
pub fn encode_header(base_version: u64) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    LittleEndian::write_u32(&mut header[0..4], MAGIC);
    LittleEndian::write_u64(&mut header[4..12], base_version);
    header
}

/// Encode one entry: record body followed by its version
pub fn encode_entry(entry: &Entry) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::with_capacity(entry.encoded_len());
    codec::encode_into(&entry.record, &mut buf)?;
    let mut version = [0u8; VERSION_SIZE];
    LittleEndian::write_u64(&mut version, entry.version);
    buf.extend_from_slice(&version);
    Ok(buf)
}

/// Decode a complete log image.
///
/// Used when opening a log and by catch-up clients decoding a streamed
/// copy.
pub fn parse(bytes: &[u8]) -> Result<ParsedLog, WalError> {
    if bytes.is_empty() {
        return Err(WalError::CorruptLog("file is empty".to_string()));
    }
    if bytes.len() < 4 {
        return Err(WalError::CorruptLog(format!(
            "truncated header ({} bytes)",
            bytes.len()
        )));
    }

    let magic = LittleEndian::read_u32(&bytes[0..4]);
    if magic != MAGIC {
        return Err(WalError::CorruptLog(format!(
            "bad magic number {:#010x}",
            magic
        )));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(WalError::CorruptLog(format!(
            "truncated header ({} bytes)",
            bytes.len()
        )));
    }

    let base_version = LittleEndian::read_u64(&bytes[4..HEADER_SIZE]);
    let mut entries = Vec::new();
    let mut previous = base_version;
    let mut cursor = HEADER_SIZE;

    while cursor < bytes.len() {
        let (record, consumed) = codec::decode(bytes, cursor)?;

        let version_at = cursor + consumed;
        if bytes.len() - version_at < VERSION_SIZE {
            return Err(FormatError::Truncated {
                offset: cursor,
                needed: consumed + VERSION_SIZE,
                available: bytes.len() - cursor,
            }
            .into());
        }
        let version = LittleEndian::read_u64(&bytes[version_at..version_at + VERSION_SIZE]);

        if version <= previous {
            return Err(WalError::NonMonotonicVersion {
                offset: cursor,
                previous,
                found: version,
            });
        }

        previous = version;
        entries.push(Entry { record, version });
        cursor = version_at + VERSION_SIZE;
    }

    Ok(ParsedLog {
        base_version,
        entries,
    })
}

/// Append-only log of versioned records, mirrored in memory.
///
/// The WAL is the only component that assigns versions.
pub struct Wal {
    path: PathBuf,
    file: File,
    entries: Vec<Entry>,
    base_version: u64,
    /// Floor for the next version when the log holds nothing newer
    offset: u64,
    /// Length of the valid prefix of the file
    len: u64,
    sync_mode: SyncMode,
    /// Set when a failed append could not be cut back off the file
    unwritable: bool,
}

impl Wal {
    /// Open the log at `path`, creating it if it does not exist.
    ///
    /// An existing log is read and validated in full; any corruption is
    /// returned as an error.
    pub fn open_or_create(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match fs::read(path) {
            Ok(bytes) => Self::open_existing(path, &bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::create(path),
            Err(e) => Err(e.into()),
        }
    }

    fn create(path: &Path) -> Result<Self, WalError> {
        info!("Initializing new WAL at {}", path.display());

        let mut file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .read(true)
            .open(path)?;
        file.write_all(&encode_header(0))?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            entries: Vec::new(),
            base_version: 0,
            offset: 0,
            len: HEADER_SIZE as u64,
            sync_mode: SyncMode::default(),
            unwritable: false,
        })
    }

    fn open_existing(path: &Path, bytes: &[u8]) -> Result<Self, WalError> {
        let parsed = parse(bytes)?;
        let file = OpenOptions::new().append(true).read(true).open(path)?;

        info!(
            "Opened WAL at {} ({} records, version {})",
            path.display(),
            parsed.entries.len(),
            parsed.entries.last().map_or(0, |e| e.version)
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            entries: parsed.entries,
            base_version: parsed.base_version,
            offset: 0,
            len: bytes.len() as u64,
            sync_mode: SyncMode::default(),
            unwritable: false,
        })
    }

    /// Set how appends are flushed
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Append a record, returning the version assigned to it.
    ///
    /// On failure the file is cut back to its previous length and neither
    /// the record list nor the version counter changes. If the file cannot
    /// be cut back, every later append is refused.
    pub fn append(&mut self, record: Record) -> Result<u64, WalError> {
        if self.unwritable {
            return Err(WalError::Unwritable(self.path.clone()));
        }

        let version = self.next_version()?;
        let entry = Entry { record, version };
        let bytes = encode_entry(&entry)?;

        if let Err(e) = self.write_entry(&bytes) {
            warn!("WAL append of version {} failed: {}", version, e);
            self.rollback();
            return Err(e);
        }

        self.len += bytes.len() as u64;
        self.entries.push(entry);
        debug!(version, bytes = bytes.len(), "appended WAL record");
        Ok(version)
    }

    fn write_entry(&mut self, bytes: &[u8]) -> Result<(), WalError> {
        self.file.write_all(bytes)?;
        if self.sync_mode == SyncMode::Always {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn rollback(&mut self) {
        // Truncate through a fresh handle; the append handle may be the
        // thing that failed
        let truncated = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|file| file.set_len(self.len));

        if let Err(e) = truncated {
            error!(
                "WAL truncate to {} bytes failed, refusing appends: {}",
                self.len, e
            );
            self.unwritable = true;
        }
    }

    fn next_version(&self) -> Result<u64, WalError> {
        let last = self
            .entries
            .last()
            .map_or(0, |e| e.version)
            .max(self.offset)
            .max(self.base_version);
        last.checked_add(1).ok_or(WalError::VersionExhausted(last))
    }

    /// Version of the last record, or 0 if the log is empty
    pub fn current_version(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.version)
    }

    /// Continue version numbering from `version` when the log holds no
    /// newer record (used after seeding from a snapshot).
    pub fn set_offset(&mut self, version: u64) {
        info!("WAL resuming version numbering after {}", version);
        self.offset = version;
    }

    /// Flush written records to stable storage.
    ///
    /// Returns the version the log is durable through.
    pub fn sync(&mut self) -> Result<u64, WalError> {
        self.file.sync_data()?;
        Ok(self.current_version())
    }

    /// Read the log file as it currently stands
    pub fn read_raw(&self) -> Result<Vec<u8>, WalError> {
        let mut bytes = fs::read(&self.path)?;
        let len = self.len as usize;
        if bytes.len() < len {
            return Err(WalError::CorruptLog(format!(
                "{} is {} bytes, expected at least {}",
                self.path.display(),
                bytes.len(),
                len
            )));
        }
        bytes.truncate(len);
        Ok(bytes)
    }

    /// The log header followed by every record newer than `version`,
    /// copied from the file.
    pub fn export_since(&self, version: u64) -> Result<Vec<u8>, WalError> {
        let raw = self.read_raw()?;

        // Versions increase, so the records to skip form a prefix
        let skipped: usize = self
            .entries
            .iter()
            .take_while(|e| e.version <= version)
            .map(Entry::encoded_len)
            .sum();
        let start = HEADER_SIZE + skipped;

        let mut out = Vec::with_capacity(raw.len() - skipped);
        out.extend_from_slice(&raw[..HEADER_SIZE]);
        out.extend_from_slice(&raw[start..]);
        Ok(out)
    }

    /// Records in file order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the log file in bytes
    pub fn file_len(&self) -> u64 {
        self.len
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
