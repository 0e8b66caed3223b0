//! In-memory storage backend.
//!
//! This module provides a thread-safe in-memory implementation of [`RecordStore`].
//! It is intended for embedded usage, tests, and as a reference implementation.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::storage::traits::{RecordStore, ScanPage, StorageError};
use crate::term::{AuthorId, CanonicalTerm, TermRecord};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Page `limit` entries out of an ordered map, starting strictly after `after`.
pub(crate) fn page_from(
    map: &BTreeMap<CanonicalTerm, TermRecord>,
    after: Option<&CanonicalTerm>,
    limit: usize,
) -> ScanPage {
    let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
    let entries: Vec<(CanonicalTerm, TermRecord)> = map
        .range::<CanonicalTerm, _>((lower, Bound::Unbounded))
        .take(limit)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let next = if limit > 0 && entries.len() == limit {
        entries.last().map(|(k, _)| k.clone())
    } else {
        None
    };

    ScanPage { entries, next }
}

/// Thread-safe in-memory record store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<CanonicalTerm, TermRecord>>,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn exists(&self, term: &CanonicalTerm) -> Result<bool, StorageError> {
        let records = self.records.read().map_err(|_| lock_err("record.exists"))?;
        Ok(records.contains_key(term))
    }

    fn get(&self, term: &CanonicalTerm) -> Result<Option<TermRecord>, StorageError> {
        let records = self.records.read().map_err(|_| lock_err("record.get"))?;
        Ok(records.get(term).cloned())
    }

    fn put_definition(
        &self,
        term: &CanonicalTerm,
        definition: &str,
        author: &AuthorId,
    ) -> Result<(), StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| lock_err("record.put_definition"))?;
        records.insert(term.clone(), TermRecord::definition(definition, author.clone()));
        Ok(())
    }

    fn put_synonym(
        &self,
        term: &CanonicalTerm,
        target: &CanonicalTerm,
        author: &AuthorId,
    ) -> Result<(), StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| lock_err("record.put_synonym"))?;
        records.insert(term.clone(), TermRecord::synonym(target.clone(), author.clone()));
        Ok(())
    }

    fn delete(&self, term: &CanonicalTerm) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| lock_err("record.delete"))?;
        records.remove(term);
        Ok(())
    }

    fn increment_hits(&self, term: &CanonicalTerm) -> Result<Option<u64>, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| lock_err("record.increment_hits"))?;
        Ok(records.get_mut(term).map(TermRecord::bump_hits))
    }

    fn scan_page(
        &self,
        after: Option<&CanonicalTerm>,
        limit: usize,
    ) -> Result<ScanPage, StorageError> {
        let records = self.records.read().map_err(|_| lock_err("record.scan_page"))?;
        Ok(page_from(&records, after, limit))
    }

    fn len(&self) -> Result<usize, StorageError> {
        let records = self.records.read().map_err(|_| lock_err("record.len"))?;
        Ok(records.len())
    }
}
