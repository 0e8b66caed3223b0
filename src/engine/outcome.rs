//! Result values returned to the command layer.
//!
//! Unknown terms, alias conflicts and refusals are ordinary outcomes here so the
//! caller can phrase each one differently.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::listing::TermListing;
use crate::resolver::SynonymConflict;
use crate::search::SearchKind;
use crate::term::{AuthorId, CanonicalTerm};

/// Result of a lookup ("what is X?").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupOutcome {
    /// Term as asked.
    pub queried_term: String,
    /// Whether a definition was reached.
    pub found: bool,
    /// Term holding the definition.
    pub canonical_term: Option<CanonicalTerm>,
    /// Definition text.
    pub definition: Option<String>,
    /// Hit count of the asked term after this lookup.
    pub hits: Option<u64>,
}

impl LookupOutcome {
    pub(crate) fn not_found(term: &str) -> Self {
        Self {
            queried_term: term.trim().to_string(),
            found: false,
            canonical_term: None,
            definition: None,
            hits: None,
        }
    }
}

/// Result of an info request ("who added X?").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoOutcome {
    /// Term as asked.
    pub queried_term: String,
    /// Whether a definition was reached.
    pub found: bool,
    /// Term holding the definition.
    pub canonical_term: Option<CanonicalTerm>,
    /// Definition text.
    pub definition: Option<String>,
    /// Hit count of the asked term's own record.
    pub hits: u64,
    /// Author of the asked term's own record.
    pub author_id: Option<AuthorId>,
    /// True if the asked term is an alias of `canonical_term`.
    pub is_alias: bool,
}

impl InfoOutcome {
    pub(crate) fn not_found(term: &str) -> Self {
        Self {
            queried_term: term.trim().to_string(),
            found: false,
            canonical_term: None,
            definition: None,
            hits: 0,
            author_id: None,
            is_alias: false,
        }
    }
}

/// Result of "remember X is Y".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RememberOutcome {
    /// Term as given.
    pub term: String,
    /// Whether the definition was stored.
    pub written: bool,
    /// True when a non-admin tried to overwrite a known term.
    pub blocked_because_existing: bool,
    /// Term holding `definition`: the written term, or the existing one's target.
    pub canonical_term: CanonicalTerm,
    /// The stored definition, or the existing one when blocked.
    pub definition: String,
}

/// Why a synonym request ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SynonymReason {
    /// The alias was created.
    Ok,
    /// Both terms are already known.
    BothKnown,
    /// Neither term is known.
    NeitherKnown,
    /// The new alias name was taken concurrently.
    AliasTaken,
    /// Both sides are the same term.
    SelfReference,
}

impl From<SynonymConflict> for SynonymReason {
    fn from(conflict: SynonymConflict) -> Self {
        match conflict {
            SynonymConflict::BothKnown => Self::BothKnown,
            SynonymConflict::NeitherKnown => Self::NeitherKnown,
            SynonymConflict::AliasTaken => Self::AliasTaken,
            SynonymConflict::SelfReference => Self::SelfReference,
        }
    }
}

/// Result of "X is also Y".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymOutcome {
    /// Whether an alias record was written.
    pub created: bool,
    /// Outcome detail.
    pub reason: SynonymReason,
    /// Left-hand term as given.
    pub term1: String,
    /// Right-hand term as given.
    pub term2: String,
    /// The new alias, when a direction could be chosen.
    pub alias: Option<CanonicalTerm>,
    /// The aliased term, when a direction could be chosen.
    pub target: Option<CanonicalTerm>,
}

/// Result of "forget X".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgetOutcome {
    /// Term as given.
    pub term: String,
    /// Whether a record was removed.
    pub deleted: bool,
    /// True when the requester is not allowed to forget.
    pub denied: bool,
}

/// Result of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    /// What was searched.
    pub kind: SearchKind,
    /// The query as given.
    pub query: String,
    /// Matching terms, sorted.
    pub matches: BTreeSet<CanonicalTerm>,
}

/// Outcome of any intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "camelCase")]
pub enum Outcome {
    /// See [`LookupOutcome`].
    Lookup(LookupOutcome),
    /// See [`InfoOutcome`].
    Info(InfoOutcome),
    /// See [`RememberOutcome`].
    Remember(RememberOutcome),
    /// See [`SynonymOutcome`].
    Synonym(SynonymOutcome),
    /// See [`ForgetOutcome`].
    Forget(ForgetOutcome),
    /// See [`SearchOutcome`].
    Search(SearchOutcome),
    /// See [`TermListing`].
    ListAll(TermListing),
}
