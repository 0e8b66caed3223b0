//! Substring search over the whole corpus.
//!
//! There is no secondary text index: every search scans all records and matches
//! case-insensitively. Term search looks at keys (aliases included); definition
//! search looks only at definition records, since aliases carry no text.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::{scan_all, RecordStore, StorageError};
use crate::term::{CanonicalTerm, TermRecord};

/// What a search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Term keys.
    Terms,
    /// Definition text.
    Definitions,
}

impl SearchKind {
    /// Plural noun used when talking about this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terms => "terms",
            Self::Definitions => "definitions",
        }
    }
}

/// Full-scan substring search.
#[derive(Clone)]
pub struct SearchIndex {
    store: Arc<dyn RecordStore>,
}

impl SearchIndex {
    /// Create a search index over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Terms whose key contains `query`.
    pub fn search_by_term(&self, query: &str) -> Result<BTreeSet<CanonicalTerm>, StorageError> {
        let needle = query.to_lowercase();
        self.collect(|term, _| term.as_str().contains(&needle))
    }

    /// Definition records whose text contains `query`.
    pub fn search_by_definition(
        &self,
        query: &str,
    ) -> Result<BTreeSet<CanonicalTerm>, StorageError> {
        let needle = query.to_lowercase();
        self.collect(|_, record| {
            record
                .definition_text()
                .map_or(false, |text| text.to_lowercase().contains(&needle))
        })
    }

    /// Dispatch on `kind`.
    pub fn search(
        &self,
        kind: SearchKind,
        query: &str,
    ) -> Result<BTreeSet<CanonicalTerm>, StorageError> {
        match kind {
            SearchKind::Terms => self.search_by_term(query),
            SearchKind::Definitions => self.search_by_definition(query),
        }
    }

    fn collect(
        &self,
        mut matches: impl FnMut(&CanonicalTerm, &TermRecord) -> bool,
    ) -> Result<BTreeSet<CanonicalTerm>, StorageError> {
        let mut found = BTreeSet::new();
        for entry in scan_all(self.store.as_ref()) {
            let (term, record) = entry?;
            if matches(&term, &record) {
                found.insert(term);
            }
        }
        Ok(found)
    }
}
