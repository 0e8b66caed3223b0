//! Write-Ahead Log (WAL) for crash recovery.
//!
//! The WAL provides durability by:
//! 1. Writing every record mutation to an append-only log before applying it
//! 2. Optionally fsyncing so the entry reaches disk
//! 3. Replaying the log on startup to rebuild the in-memory index
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [ENTRY 1: codec frame of WalEntry]
//! [ENTRY 2: codec frame of WalEntry]
//! ...
//! ```
//!
//! A torn or corrupt tail is cut off when the log is opened, so later appends
//! never land behind unreadable bytes.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Result as IoResult, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::term::{AuthorId, CanonicalTerm};

use super::codec;

/// A single entry in the write-ahead log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    /// Monotonically increasing sequence number.
    pub sequence: u64,
    /// When this entry was written.
    pub timestamp: DateTime<Utc>,
    /// The mutation being logged.
    pub kind: WalEntryKind,
}

/// The mutation recorded by a WAL entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum WalEntryKind {
    /// Definition record written with zero hits.
    PutDefinition {
        term: CanonicalTerm,
        definition: String,
        author_id: AuthorId,
    },
    /// Alias record written with zero hits.
    PutSynonym {
        term: CanonicalTerm,
        target: CanonicalTerm,
        author_id: AuthorId,
    },
    Delete {
        term: CanonicalTerm,
    },
    /// Absolute counter value after the increment, so replay is idempotent.
    Hits {
        term: CanonicalTerm,
        hits: u64,
    },
    /// All entries up to this sequence are persisted in a segment.
    Checkpoint {
        up_to_sequence: u64,
    },
}

struct WalState {
    writer: BufWriter<File>,
    sequence: u64,
}

/// Write-Ahead Log for crash recovery.
///
/// Thread-safe via an internal mutex; appends are serialized.
pub struct WriteAheadLog {
    path: PathBuf,
    state: Mutex<WalState>,
    sync_on_write: bool,
}

fn poisoned() -> std::io::Error {
    std::io::Error::new(ErrorKind::Other, "poisoned lock: wal")
}

impl WriteAheadLog {
    /// Open or create a WAL file.
    ///
    /// An existing file is scanned for its last valid sequence number and cut back
    /// to the end of the last valid entry. A new file gets a fresh header.
    pub fn open(path: &Path, sync_on_write: bool) -> IoResult<Self> {
        let exists = path.exists() && std::fs::metadata(path)?.len() >= codec::HEADER_LEN;

        let sequence = if exists {
            let (last_seq, valid_len) = Self::scan_valid_prefix(path)?;
            let file = OpenOptions::new().write(true).open(path)?;
            if file.metadata()?.len() > valid_len {
                warn!(
                    path = %path.display(),
                    valid_len,
                    "truncating damaged WAL tail"
                );
                file.set_len(valid_len)?;
                file.sync_all()?;
            }
            last_seq
        } else {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            codec::write_header(&mut file)?;
            if sync_on_write {
                file.sync_all()?;
            }
            0
        };

        let file = OpenOptions::new().append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(WalState {
                writer: BufWriter::new(file),
                sequence,
            }),
            sync_on_write,
        })
    }

    fn lock(&self) -> IoResult<MutexGuard<'_, WalState>> {
        self.state.lock().map_err(|_| poisoned())
    }

    /// Append an entry to the WAL.
    ///
    /// Returns the sequence number assigned to this entry.
    pub fn append(&self, kind: WalEntryKind) -> IoResult<u64> {
        let mut state = self.lock()?;

        let candidate = state.sequence + 1;
        let entry = WalEntry {
            sequence: candidate,
            timestamp: Utc::now(),
            kind,
        };
        let encoded = codec::encode(&entry)?;

        state.writer.write_all(&encoded)?;
        state.writer.flush()?;
        if self.sync_on_write {
            state.writer.get_ref().sync_all()?;
        }

        state.sequence = candidate;
        Ok(candidate)
    }

    /// Iterate over all entries in the WAL.
    pub fn iter(&self) -> IoResult<WalIterator> {
        WalIterator::new(&self.path)
    }

    /// Get the current sequence number.
    pub fn current_sequence(&self) -> IoResult<u64> {
        Ok(self.lock()?.sequence)
    }

    /// Get the WAL file size in bytes.
    pub fn size_bytes(&self) -> IoResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Empty the log after a checkpoint, leaving only the header.
    ///
    /// Only call this once the checkpointed state is durable in a segment.
    pub fn truncate(&self) -> IoResult<()> {
        let mut state = self.lock()?;
        state.writer.flush()?;

        {
            let mut file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
            codec::write_header(&mut file)?;
            if self.sync_on_write {
                file.sync_all()?;
            }
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        state.writer = BufWriter::new(file);
        state.sequence = 0;
        Ok(())
    }

    /// Returns `(last valid sequence, byte length of the valid prefix)`.
    fn scan_valid_prefix(path: &Path) -> IoResult<(u64, u64)> {
        let mut iter = WalIterator::new(path)?;
        let mut last_seq = 0;
        let mut valid_len = iter.position()?;

        while let Some(entry) = iter.next() {
            match entry {
                Ok(entry) => {
                    last_seq = entry.sequence;
                    valid_len = iter.position()?;
                }
                Err(e) => {
                    warn!(after_sequence = last_seq, error = %e, "WAL corruption detected");
                    break;
                }
            }
        }

        Ok((last_seq, valid_len))
    }
}

/// Iterator over WAL entries.
///
/// Stops cleanly at a torn final frame; yields an error for a corrupt one.
pub struct WalIterator {
    reader: BufReader<File>,
    file_size: u64,
}

impl WalIterator {
    fn new(path: &Path) -> IoResult<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let _version = codec::read_header(&mut reader)?;
        Ok(Self { reader, file_size })
    }

    fn position(&mut self) -> IoResult<u64> {
        self.reader.stream_position()
    }
}

impl Iterator for WalIterator {
    type Item = IoResult<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.position() {
            Ok(pos) if pos >= self.file_size => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(e)),
        }

        match codec::decode(&mut self.reader) {
            Ok(entry) => Some(Ok(entry)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }
}
