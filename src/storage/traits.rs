//! Abstract storage trait for term records.
//!
//! The trait defines the contract that storage backends must implement.
//! By using a trait, we enable:
//! - In-memory backends for testing and embedded use
//! - Persistent backends for production
//! - Shared remote key-value backends behind the same seam

use thiserror::Error;

use crate::term::{AuthorId, CanonicalTerm, TermRecord};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend error (poisoned lock, network, WAL write).
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page of a key-ordered scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Entries in this page.
    pub entries: Vec<(CanonicalTerm, TermRecord)>,
    /// Cursor to pass as `after` for the next page; `None` once the scan is done.
    pub next: Option<CanonicalTerm>,
}

/// Storage trait for term records.
///
/// Every method is atomic for the single key it touches. Nothing is atomic across
/// keys; callers must tolerate interleavings with other writers.
pub trait RecordStore: Send + Sync {
    /// Returns true if any record exists under `term`.
    fn exists(&self, term: &CanonicalTerm) -> Result<bool, StorageError>;

    /// Get the record stored under `term`.
    fn get(&self, term: &CanonicalTerm) -> Result<Option<TermRecord>, StorageError>;

    /// Store a definition, replacing whatever was there. Resets hits to 0.
    fn put_definition(
        &self,
        term: &CanonicalTerm,
        definition: &str,
        author: &AuthorId,
    ) -> Result<(), StorageError>;

    /// Store an alias, replacing whatever was there. Resets hits to 0.
    fn put_synonym(
        &self,
        term: &CanonicalTerm,
        target: &CanonicalTerm,
        author: &AuthorId,
    ) -> Result<(), StorageError>;

    /// Remove the record. Deleting an absent term is not an error.
    fn delete(&self, term: &CanonicalTerm) -> Result<(), StorageError>;

    /// Increment the hit counter and return the new value.
    ///
    /// Returns `None` if the record no longer exists; no record is created.
    fn increment_hits(&self, term: &CanonicalTerm) -> Result<Option<u64>, StorageError>;

    /// Fetch up to `limit` entries with keys strictly after `after`, in key order.
    fn scan_page(
        &self,
        after: Option<&CanonicalTerm>,
        limit: usize,
    ) -> Result<ScanPage, StorageError>;

    /// Number of stored records.
    fn len(&self) -> Result<usize, StorageError>;

    /// Returns true if the store holds no records.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_record_store_object_safe(_: &dyn RecordStore) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Backend("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));

        let err = StorageError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(err.to_string().contains("disk full"));
    }
}
