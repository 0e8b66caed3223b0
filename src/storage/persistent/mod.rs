//! Persistent storage backend for the glossary.
//!
//! This module provides durable, crash-safe storage with:
//! - Write-Ahead Logging (WAL) for crash recovery
//! - File locking for single-process access
//! - CRC32 checksums for corruption detection
//! - Snapshot segments written by compaction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   PersistentRecordStore                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │        in-memory index (BTreeMap, serves all reads)          │
//! │  ┌─────────────────┐  ┌─────────────────┐                    │
//! │  │ WriteAheadLog   │  │ SegmentManager  │                    │
//! │  │ (append-only)   │  │ (snapshots)     │                    │
//! │  └────────┬────────┘  └────────┬────────┘                    │
//! │           └──────────┬─────────┘                             │
//! │                      ↓                                       │
//! │           ┌─────────────────────┐                            │
//! │           │   FileLock (flock)  │                            │
//! │           └─────────────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod codec;
mod file_lock;
mod segment;
mod stores;
mod wal;

pub use file_lock::FileLock;
pub use segment::{Segment, SegmentData, SegmentManager};
pub use stores::{CompactionResult, PersistentRecordStore, SEGMENTS_DIR_NAME, WAL_FILE_NAME};
pub use wal::{WalEntry, WalEntryKind, WriteAheadLog};

use std::path::Path;

use crate::error::{GlossaryResult, ValidationError};

/// Configuration for persistent storage.
#[derive(Debug, Clone)]
pub struct PersistentConfig {
    /// WAL size (bytes) past which the store compacts after a write.
    pub max_wal_size: u64,
    /// Whether to fsync after every write (slower but safer).
    pub sync_on_write: bool,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            max_wal_size: 64 * 1024 * 1024, // 64 MB
            sync_on_write: true,
        }
    }
}

impl PersistentConfig {
    const MIN_WAL_SIZE: u64 = 4 * 1024; // avoids compacting after every write

    /// Check the configuration.
    ///
    /// # Errors
    /// `ValidationError::InvalidConfig` if `max_wal_size` is below 4 KiB.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.max_wal_size < Self::MIN_WAL_SIZE {
            return Err(ValidationError::InvalidConfig {
                field: "max_wal_size",
                reason: format!(
                    "must be at least {} bytes (got {})",
                    Self::MIN_WAL_SIZE,
                    self.max_wal_size
                ),
            });
        }
        Ok(self)
    }
}

/// Open or create a persistent glossary at the given path.
///
/// # Errors
/// - If the configuration is invalid
/// - If the path cannot be created or accessed
/// - If another process holds the lock
/// - If the newest segment cannot be read
///
/// # Example
/// ```rust,ignore
/// use std::sync::Arc;
/// use glossary::storage::open_database;
///
/// let store = Arc::new(open_database("./glossary.db", None)?);
/// let glossary = KnowledgeStore::new(store, Arc::new(StaticAdmins::default()));
/// ```
pub fn open_database(
    path: impl AsRef<Path>,
    config: Option<PersistentConfig>,
) -> GlossaryResult<PersistentRecordStore> {
    let cfg = config.unwrap_or_default().validate()?;
    PersistentRecordStore::open(path.as_ref(), cfg)
}
