//! WAL-backed record store.
//!
//! The store wraps:
//! - An in-memory ordered index serving every read
//! - A write-ahead log every mutation is appended to before it is applied
//! - A segment manager holding the last compacted snapshot

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::error::{GlossaryError, GlossaryResult};
use crate::storage::memory::page_from;
use crate::storage::traits::{RecordStore, ScanPage, StorageError};
use crate::term::{AuthorId, CanonicalTerm, TermRecord};

use super::file_lock::FileLock;
use super::segment::{SegmentData, SegmentManager};
use super::wal::{WalEntryKind, WriteAheadLog};
use super::PersistentConfig;

/// WAL file name inside the data directory.
pub const WAL_FILE_NAME: &str = "glossary.wal";

/// Segment subdirectory inside the data directory.
pub const SEGMENTS_DIR_NAME: &str = "segments";

type Index = BTreeMap<CanonicalTerm, TermRecord>;

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

fn wal_err(e: &std::io::Error) -> StorageError {
    StorageError::Backend(format!("WAL write failed: {e}"))
}

fn open_err(what: &str, e: impl std::fmt::Display) -> GlossaryError {
    GlossaryError::StoreUnavailable(StorageError::Backend(format!("failed to {what}: {e}")))
}

/// Apply one logged mutation to an index. Shared by the write path and replay.
fn apply(index: &mut Index, kind: WalEntryKind) {
    match kind {
        WalEntryKind::PutDefinition {
            term,
            definition,
            author_id,
        } => {
            index.insert(term, TermRecord::definition(definition, author_id));
        }
        WalEntryKind::PutSynonym {
            term,
            target,
            author_id,
        } => {
            index.insert(term, TermRecord::synonym(target, author_id));
        }
        WalEntryKind::Delete { term } => {
            index.remove(&term);
        }
        WalEntryKind::Hits { term, hits } => {
            if let Some(
                TermRecord::Definition { hits: current, .. }
                | TermRecord::Synonym { hits: current, .. },
            ) = index.get_mut(&term)
            {
                *current = hits;
            }
        }
        WalEntryKind::Checkpoint { .. } => {}
    }
}

/// Result of a compaction.
#[derive(Debug, Clone)]
pub struct CompactionResult {
    /// Number of records written to the new segment.
    pub records_compacted: u64,
    /// Path to the new segment file (if one was written).
    pub segment_path: Option<PathBuf>,
    /// WAL size before compaction.
    pub wal_size_before: u64,
    /// WAL size after compaction.
    pub wal_size_after: u64,
}

/// Durable, single-process record store.
///
/// Open with [`super::open_database`]. The directory stays locked until the store
/// is dropped.
pub struct PersistentRecordStore {
    dir: PathBuf,
    _lock: FileLock,
    wal: WriteAheadLog,
    segments: Mutex<SegmentManager>,
    index: RwLock<Index>,
    config: PersistentConfig,
}

impl PersistentRecordStore {
    /// Open or create a store in `dir`: lock, load the newest segment, replay the WAL.
    pub fn open(dir: &Path, config: PersistentConfig) -> GlossaryResult<Self> {
        fs::create_dir_all(dir).map_err(|e| open_err("create data directory", e))?;
        let lock = FileLock::acquire(dir).map_err(|e| open_err("acquire lock", e))?;

        let segments = SegmentManager::open(&dir.join(SEGMENTS_DIR_NAME))
            .map_err(|e| open_err("open segments", e))?;
        let mut index = segments
            .load_latest()
            .map_err(|e| open_err("load segment data", e))?
            .into_index();

        let wal = WriteAheadLog::open(&dir.join(WAL_FILE_NAME), config.sync_on_write)
            .map_err(|e| open_err("open WAL", e))?;

        let mut replayed = 0usize;
        for entry in wal.iter().map_err(|e| open_err("iterate WAL", e))? {
            let entry = entry.map_err(|e| open_err("read WAL entry", e))?;
            apply(&mut index, entry.kind);
            replayed += 1;
        }
        if replayed > 0 {
            info!(entries = replayed, records = index.len(), "replayed WAL");
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            wal,
            segments: Mutex::new(segments),
            index: RwLock::new(index),
            config,
        })
    }

    /// The data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current WAL size in bytes.
    #[must_use]
    pub fn wal_size(&self) -> u64 {
        self.wal.size_bytes().unwrap_or(0)
    }

    /// Fold the WAL into a new snapshot segment and empty it.
    ///
    /// Writers are blocked for the duration, so no entry can slip in between the
    /// snapshot and the truncation. A failure part-way leaves the WAL intact; it is
    /// replayed on the next open.
    pub fn compact(&self) -> Result<CompactionResult, StorageError> {
        let index = self.index.write().map_err(|_| lock_err("record.compact"))?;
        self.compact_locked(&index)
    }

    fn compact_locked(&self, index: &Index) -> Result<CompactionResult, StorageError> {
        let current_seq = self.wal.current_sequence()?;
        let wal_size_before = self.wal.size_bytes()?;
        if current_seq == 0 {
            return Ok(CompactionResult {
                records_compacted: 0,
                segment_path: None,
                wal_size_before,
                wal_size_after: wal_size_before,
            });
        }

        let data = SegmentData::from_index(index);
        let records_compacted = data.record_count();

        let mut segments = self.segments.lock().map_err(|_| lock_err("segments"))?;
        let mut writer = segments.create_segment_writer()?;
        writer.write_data(&data, current_seq)?;
        let segment = writer.finalize()?;
        let segment_path = segment.path().to_path_buf();
        segments.install(segment)?;
        drop(segments);

        self.wal
            .append(WalEntryKind::Checkpoint {
                up_to_sequence: current_seq,
            })
            .map_err(|e| wal_err(&e))?;
        self.wal.truncate()?;

        let wal_size_after = self.wal.size_bytes()?;
        info!(
            records = records_compacted,
            wal_size_before, wal_size_after, "compacted WAL into segment"
        );

        Ok(CompactionResult {
            records_compacted,
            segment_path: Some(segment_path),
            wal_size_before,
            wal_size_after,
        })
    }

    /// Log `kind`, apply it, and compact if the WAL outgrew its budget.
    ///
    /// Once the entry is in the WAL the write has succeeded. A failed compaction
    /// is logged and retried on the next write.
    fn write(
        &self,
        mut index: RwLockWriteGuard<'_, Index>,
        kind: WalEntryKind,
    ) -> Result<(), StorageError> {
        self.wal.append(kind.clone()).map_err(|e| wal_err(&e))?;
        apply(&mut index, kind);

        let wal_size = self.wal_size();
        if wal_size > self.config.max_wal_size {
            debug!(wal_size, "WAL over budget, compacting");
            if let Err(e) = self.compact_locked(&index) {
                warn!(wal_size, error = %e, "automatic compaction failed; WAL kept");
            }
        }
        Ok(())
    }

    fn write_lock(
        &self,
        context: &'static str,
    ) -> Result<RwLockWriteGuard<'_, Index>, StorageError> {
        self.index.write().map_err(|_| lock_err(context))
    }
}

impl RecordStore for PersistentRecordStore {
    fn exists(&self, term: &CanonicalTerm) -> Result<bool, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("record.exists"))?;
        Ok(index.contains_key(term))
    }

    fn get(&self, term: &CanonicalTerm) -> Result<Option<TermRecord>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("record.get"))?;
        Ok(index.get(term).cloned())
    }

    fn put_definition(
        &self,
        term: &CanonicalTerm,
        definition: &str,
        author: &AuthorId,
    ) -> Result<(), StorageError> {
        let index = self.write_lock("record.put_definition")?;
        self.write(
            index,
            WalEntryKind::PutDefinition {
                term: term.clone(),
                definition: definition.to_string(),
                author_id: author.clone(),
            },
        )
    }

    fn put_synonym(
        &self,
        term: &CanonicalTerm,
        target: &CanonicalTerm,
        author: &AuthorId,
    ) -> Result<(), StorageError> {
        let index = self.write_lock("record.put_synonym")?;
        self.write(
            index,
            WalEntryKind::PutSynonym {
                term: term.clone(),
                target: target.clone(),
                author_id: author.clone(),
            },
        )
    }

    fn delete(&self, term: &CanonicalTerm) -> Result<(), StorageError> {
        let index = self.write_lock("record.delete")?;
        if !index.contains_key(term) {
            return Ok(());
        }
        self.write(index, WalEntryKind::Delete { term: term.clone() })
    }

    fn increment_hits(&self, term: &CanonicalTerm) -> Result<Option<u64>, StorageError> {
        let index = self.write_lock("record.increment_hits")?;
        let Some(record) = index.get(term) else {
            return Ok(None);
        };
        let hits = record.hits().saturating_add(1);
        self.write(
            index,
            WalEntryKind::Hits {
                term: term.clone(),
                hits,
            },
        )?;
        Ok(Some(hits))
    }

    fn scan_page(
        &self,
        after: Option<&CanonicalTerm>,
        limit: usize,
    ) -> Result<ScanPage, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("record.scan_page"))?;
        Ok(page_from(&index, after, limit))
    }

    fn len(&self) -> Result<usize, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("record.len"))?;
        Ok(index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(s: &str) -> CanonicalTerm {
        CanonicalTerm::new(s).unwrap()
    }

    fn open(dir: &Path) -> PersistentRecordStore {
        PersistentRecordStore::open(dir, PersistentConfig::default()).unwrap()
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        let author = AuthorId::new("u1");
        {
            let store = open(dir.path());
            store.put_definition(&key("rust"), "a systems language", &author).unwrap();
            store.put_synonym(&key("rustlang"), &key("rust"), &author).unwrap();
            store.increment_hits(&key("rust")).unwrap();
            store.increment_hits(&key("rust")).unwrap();
            store.put_definition(&key("temp"), "short lived", &author).unwrap();
            store.delete(&key("temp")).unwrap();
        }

        let store = open(dir.path());
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.get(&key("rust")).unwrap().unwrap().hits(), 2);
        assert_eq!(
            store.get(&key("rustlang")).unwrap().unwrap().synonym_target(),
            Some(&key("rust"))
        );
        assert!(!store.exists(&key("temp")).unwrap());
    }

    #[test]
    fn deleting_absent_term_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let before = store.wal_size();
        store.delete(&key("ghost")).unwrap();
        assert_eq!(store.wal_size(), before);
        assert_eq!(store.increment_hits(&key("ghost")).unwrap(), None);
        assert_eq!(store.wal_size(), before);
    }

    #[test]
    fn compaction_preserves_state_and_empties_wal() {
        let dir = tempdir().unwrap();
        let author = AuthorId::new("u1");
        {
            let store = open(dir.path());
            for i in 0..20 {
                store
                    .put_definition(&key(&format!("term{i:02}")), "d", &author)
                    .unwrap();
            }
            store.increment_hits(&key("term03")).unwrap();

            let result = store.compact().unwrap();
            assert_eq!(result.records_compacted, 20);
            assert!(result.segment_path.is_some());
            assert!(result.wal_size_after < result.wal_size_before);

            // Writes after compaction land in the fresh WAL.
            store.delete(&key("term00")).unwrap();
        }

        let store = open(dir.path());
        assert_eq!(store.len().unwrap(), 19);
        assert_eq!(store.get(&key("term03")).unwrap().unwrap().hits(), 1);
    }

    #[test]
    fn compaction_of_empty_wal_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let result = store.compact().unwrap();
        assert_eq!(result.records_compacted, 0);
        assert!(result.segment_path.is_none());
    }

    #[test]
    fn oversized_wal_compacts_automatically() {
        let dir = tempdir().unwrap();
        let config = PersistentConfig {
            max_wal_size: 4 * 1024,
            sync_on_write: false,
        };
        let store = PersistentRecordStore::open(dir.path(), config).unwrap();
        let author = AuthorId::new("u1");
        for i in 0..200 {
            store
                .put_definition(
                    &key(&format!("term{i:03}")),
                    "a fairly long definition text",
                    &author,
                )
                .unwrap();
        }

        assert!(store.wal_size() <= 4 * 1024 + 512);
        assert!(dir.path().join(SEGMENTS_DIR_NAME).read_dir().unwrap().count() >= 1);
        drop(store);

        let store = open(dir.path());
        assert_eq!(store.len().unwrap(), 200);
    }

    #[test]
    fn failed_auto_compaction_keeps_writes_succeeding() {
        let dir = tempdir().unwrap();
        let config = PersistentConfig {
            max_wal_size: 4 * 1024,
            sync_on_write: false,
        };
        let store = PersistentRecordStore::open(dir.path(), config).unwrap();
        let author = AuthorId::new("u1");

        // No segment can be written while `segments` is a plain file.
        let segments = dir.path().join(SEGMENTS_DIR_NAME);
        fs::remove_dir_all(&segments).unwrap();
        fs::write(&segments, b"not a directory").unwrap();

        for i in 0..100 {
            let term = key(&format!("term{i:03}"));
            store
                .put_definition(&term, "a fairly long definition text", &author)
                .unwrap();
            assert!(store.exists(&term).unwrap());
        }
        assert!(store.wal_size() > 4 * 1024);

        // Once segments can be written again the next write compacts.
        fs::remove_file(&segments).unwrap();
        fs::create_dir(&segments).unwrap();
        store.put_definition(&key("last"), "d", &author).unwrap();
        assert!(store.wal_size() <= 4 * 1024);
        drop(store);

        let store = open(dir.path());
        assert_eq!(store.len().unwrap(), 101);
    }
}
