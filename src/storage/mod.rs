//! Record storage for the glossary.
//!
//! [`RecordStore`] is the seam every higher component talks to. Backends:
//! - [`InMemoryRecordStore`] for tests and embedded use
//! - `PersistentRecordStore` (feature `persistent`), WAL-backed and crash-safe

mod memory;
mod scan;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::InMemoryRecordStore;
pub use scan::{scan_all, scan_all_paged, ScanAll, SCAN_PAGE_SIZE};
pub use traits::{RecordStore, ScanPage, StorageError};

#[cfg(feature = "persistent")]
pub use persistent::{open_database, CompactionResult, PersistentConfig, PersistentRecordStore};
