//! Lazy full-corpus scan over a [`RecordStore`].

use std::collections::VecDeque;

use crate::term::{CanonicalTerm, TermRecord};

use super::traits::{RecordStore, StorageError};

/// Entries fetched per page.
pub const SCAN_PAGE_SIZE: usize = 1000;

/// Iterator over every `(term, record)` pair in a store.
///
/// Pages are fetched on demand, so writes that land between pages are visible to
/// the rest of the scan. Each page is consistent on its own; the whole scan is not.
/// Calling [`scan_all`] again restarts from the first key.
pub struct ScanAll<'a> {
    store: &'a dyn RecordStore,
    buffer: VecDeque<(CanonicalTerm, TermRecord)>,
    cursor: Option<CanonicalTerm>,
    page_size: usize,
    done: bool,
}

impl<'a> ScanAll<'a> {
    fn new(store: &'a dyn RecordStore, page_size: usize) -> Self {
        Self {
            store,
            buffer: VecDeque::new(),
            cursor: None,
            page_size: page_size.max(1),
            done: false,
        }
    }

    fn fill(&mut self) -> Result<(), StorageError> {
        let page = self.store.scan_page(self.cursor.as_ref(), self.page_size)?;
        self.buffer.extend(page.entries);
        match page.next {
            Some(next) => self.cursor = Some(next),
            None => self.done = true,
        }
        Ok(())
    }
}

impl Iterator for ScanAll<'_> {
    type Item = Result<(CanonicalTerm, TermRecord), StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.is_empty() {
            if self.done {
                return None;
            }
            if let Err(e) = self.fill() {
                self.done = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Scan every record in `store`, [`SCAN_PAGE_SIZE`] entries at a time.
#[must_use]
pub fn scan_all(store: &dyn RecordStore) -> ScanAll<'_> {
    ScanAll::new(store, SCAN_PAGE_SIZE)
}

/// Like [`scan_all`] with an explicit page size.
#[must_use]
pub fn scan_all_paged(store: &dyn RecordStore, page_size: usize) -> ScanAll<'_> {
    ScanAll::new(store, page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryRecordStore;
    use crate::term::AuthorId;

    fn key(s: &str) -> CanonicalTerm {
        CanonicalTerm::new(s).unwrap()
    }

    #[test]
    fn scan_crosses_page_boundaries() {
        let store = InMemoryRecordStore::new();
        let author = AuthorId::new("u1");
        for i in 0..7 {
            store
                .put_definition(&key(&format!("term{i}")), "d", &author)
                .unwrap();
        }

        let terms: Vec<String> = scan_all_paged(&store, 3)
            .map(|r| r.unwrap().0.into_string())
            .collect();
        assert_eq!(terms.len(), 7);
        assert_eq!(terms[0], "term0");
        assert_eq!(terms[6], "term6");
    }

    #[test]
    fn scan_is_restartable() {
        let store = InMemoryRecordStore::new();
        store
            .put_definition(&key("a"), "first", &AuthorId::new("u1"))
            .unwrap();

        assert_eq!(scan_all(&store).count(), 1);
        assert_eq!(scan_all(&store).count(), 1);
    }

    #[test]
    fn scan_of_empty_store_ends_immediately() {
        let store = InMemoryRecordStore::new();
        assert!(scan_all(&store).next().is_none());
    }
}
