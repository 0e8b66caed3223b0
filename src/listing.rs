//! Listing every known term.
//!
//! Small corpora are listed in full. Past the display threshold only directly
//! defined terms are eligible, and the most looked-up ones are shown.

use std::cmp::Reverse;
use std::sync::Arc;

use serde::Serialize;

use crate::storage::{scan_all, RecordStore, StorageError};
use crate::term::CanonicalTerm;

/// Default number of terms in a ranked sample.
pub const DEFAULT_SAMPLE_SIZE: usize = 24;

/// Result of [`RankedLister::list_all_terms`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TermListing {
    /// Every term, alphabetically.
    FullList {
        /// All keys, aliases included.
        terms: Vec<CanonicalTerm>,
    },
    /// The most popular definitions only.
    RankedSample {
        /// Sampled terms, most hits first, ties alphabetical.
        sampled_terms: Vec<CanonicalTerm>,
        /// Number of records in the corpus.
        total_count: usize,
    },
}

impl TermListing {
    /// Terms included in the listing.
    #[must_use]
    pub fn terms(&self) -> &[CanonicalTerm] {
        match self {
            Self::FullList { terms } => terms,
            Self::RankedSample { sampled_terms, .. } => sampled_terms,
        }
    }
}

/// Produces full or ranked term listings.
#[derive(Clone)]
pub struct RankedLister {
    store: Arc<dyn RecordStore>,
    sample_size: usize,
}

impl RankedLister {
    /// Create a lister sampling [`DEFAULT_SAMPLE_SIZE`] terms.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_sample_size(store, DEFAULT_SAMPLE_SIZE)
    }

    /// Create a lister with an explicit sample size.
    #[must_use]
    pub fn with_sample_size(store: Arc<dyn RecordStore>, sample_size: usize) -> Self {
        Self { store, sample_size }
    }

    /// List the corpus.
    ///
    /// Returns a [`TermListing::FullList`] when the corpus has at most `threshold`
    /// records or `include_all` is set, a [`TermListing::RankedSample`] otherwise.
    pub fn list_all_terms(
        &self,
        threshold: usize,
        include_all: bool,
    ) -> Result<TermListing, StorageError> {
        let mut total_count = 0usize;
        let mut all_terms = Vec::new();
        let mut ranked: Vec<(Reverse<u64>, CanonicalTerm)> = Vec::new();

        // A single pass serves both shapes; the scan is a moving view anyway.
        for entry in scan_all(self.store.as_ref()) {
            let (term, record) = entry?;
            total_count += 1;
            if !record.is_synonym() {
                ranked.push((Reverse(record.hits()), term.clone()));
            }
            all_terms.push(term);
        }

        if include_all || total_count <= threshold {
            all_terms.sort();
            return Ok(TermListing::FullList { terms: all_terms });
        }

        ranked.sort();
        let sampled_terms = ranked
            .into_iter()
            .take(self.sample_size)
            .map(|(_, term)| term)
            .collect();

        Ok(TermListing::RankedSample {
            sampled_terms,
            total_count,
        })
    }
}
