//! # Glossary - a conversational term/definition store
//!
//! Glossary backs a chat assistant that remembers what things mean. Users teach it
//! terms ("remember rust is a systems language"), ask for them back ("what is
//! rust?"), link aliases ("rustlang is also rust"), search, list, and (admins only)
//! forget.
//!
//! ## Core Concepts
//!
//! - **Term**: case-insensitive, whitespace-trimmed key ([`CanonicalTerm`])
//! - **Record**: either a definition or an alias of another term ([`TermRecord`])
//! - **Resolution**: following aliases to a definition, pruning broken chains
//! - **Hits**: lookup counters used to rank listings of large glossaries
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use glossary::{InMemoryRecordStore, KnowledgeStore, Requester, StaticAdmins};
//!
//! let store = KnowledgeStore::new(
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(StaticAdmins::new(["alice"])),
//! );
//! let bob = Requester::new("bob");
//!
//! store.remember("Rust", "a systems language", &bob)?;
//! store.synonym("rust", "rustlang", &bob)?;
//!
//! let answer = store.lookup("RustLang")?;
//! assert_eq!(answer.definition.as_deref(), Some("a systems language"));
//! # Ok::<(), glossary::GlossaryError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod intent;
pub mod term;

// Storage and algorithms
pub mod listing;
pub mod resolver;
pub mod search;
pub mod storage;

// Façade
pub mod auth;
pub mod engine;

pub use auth::{Authorizer, StaticAdmins};
pub use engine::{
    ForgetOutcome, InfoOutcome, KnowledgeStore, KnowledgeStoreConfig, LookupOutcome, Outcome,
    RememberOutcome, SearchOutcome, SynonymOutcome, SynonymReason,
};
pub use error::{GlossaryError, GlossaryResult, ValidationError};
pub use intent::{Intent, Requester};
pub use listing::{RankedLister, TermListing, DEFAULT_SAMPLE_SIZE};
pub use resolver::{ResolvedDefinition, SynonymConflict, SynonymCreation, SynonymResolver};
pub use search::{SearchIndex, SearchKind};
pub use storage::{InMemoryRecordStore, RecordStore, StorageError};
pub use term::{AuthorId, CanonicalTerm, TermRecord};

#[cfg(feature = "persistent")]
pub use storage::{open_database, PersistentConfig, PersistentRecordStore};
