//! Alias chain resolution.
//!
//! [`SynonymResolver`] follows synonym records from a starting term to the
//! definition they ultimately point at. The walk keeps a visited set, so a cycle
//! built by independent writes (`a -> b`, `b -> a`) terminates. A chain that loops
//! or points at a missing record is broken: every alias on the walked path is
//! deleted and the lookup comes back empty. Nothing about the repair is reported
//! as an error.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::storage::{RecordStore, StorageError};
use crate::term::{AuthorId, CanonicalTerm, TermRecord};

/// A definition reached from a queried term.
///
/// `author_id` and `hits` describe the queried term's own record; the
/// `definition_*` / `canonical_hits` fields describe the definition at the end of
/// the chain. They are the same record when no alias was followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDefinition {
    /// The term that was asked for.
    pub queried_term: CanonicalTerm,
    /// The term holding the definition.
    pub canonical_term: CanonicalTerm,
    /// Definition text.
    pub definition: String,
    /// Author of the queried term's record.
    pub author_id: AuthorId,
    /// Hit count of the queried term's record.
    pub hits: u64,
    /// Author of the definition record.
    pub definition_author_id: AuthorId,
    /// Hit count of the definition record.
    pub canonical_hits: u64,
}

impl ResolvedDefinition {
    /// True if at least one alias was followed.
    #[must_use]
    pub fn is_alias(&self) -> bool {
        self.queried_term != self.canonical_term
    }
}

/// Why an alias could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SynonymConflict {
    /// Both terms already denote records.
    BothKnown,
    /// The target denotes nothing, so there is nothing to alias to.
    NeitherKnown,
    /// The new term is already taken (the target is unknown).
    AliasTaken,
    /// A term cannot be an alias of itself.
    SelfReference,
}

/// Outcome of [`SynonymResolver::add_synonym`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynonymCreation {
    /// The alias record was written.
    Created,
    /// The alias was rejected.
    Conflict(SynonymConflict),
}

/// Walks alias chains against a shared record store.
#[derive(Clone)]
pub struct SynonymResolver {
    store: Arc<dyn RecordStore>,
}

impl SynonymResolver {
    /// Create a resolver over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Resolve `term` to its definition, optionally counting a hit.
    ///
    /// When `count_hit` is set and resolution succeeds, the queried term's counter
    /// is incremented and, if an alias was followed, the definition's counter too.
    ///
    /// # Errors
    /// Only store failures. A missing or broken chain is `Ok(None)`.
    pub fn resolve_definition(
        &self,
        term: &CanonicalTerm,
        count_hit: bool,
    ) -> Result<Option<ResolvedDefinition>, StorageError> {
        let Some(first) = self.store.get(term)? else {
            return Ok(None);
        };

        let mut visited: HashSet<CanonicalTerm> = HashSet::from([term.clone()]);
        let mut path: Vec<CanonicalTerm> = Vec::new();
        let mut current = term.clone();
        let mut record = first.clone();

        loop {
            match record {
                TermRecord::Definition {
                    definition,
                    author_id,
                    hits,
                } => {
                    return self
                        .finish(term, &first, current, definition, author_id, hits, count_hit)
                        .map(Some);
                }
                TermRecord::Synonym { synonym_of, .. } => {
                    path.push(current);

                    if visited.contains(&synonym_of) {
                        debug!(term = %term, target = %synonym_of, "alias cycle detected");
                        self.heal(&path)?;
                        return Ok(None);
                    }

                    let Some(next) = self.store.get(&synonym_of)? else {
                        debug!(term = %term, target = %synonym_of, "dangling alias detected");
                        self.heal(&path)?;
                        return Ok(None);
                    };

                    visited.insert(synonym_of.clone());
                    current = synonym_of;
                    record = next;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        queried: &CanonicalTerm,
        first: &TermRecord,
        canonical: CanonicalTerm,
        definition: String,
        definition_author_id: AuthorId,
        mut canonical_hits: u64,
        count_hit: bool,
    ) -> Result<ResolvedDefinition, StorageError> {
        let mut hits = first.hits();
        let is_alias = *queried != canonical;

        if count_hit {
            // A concurrent delete makes the increment a no-op; keep what was read.
            if let Some(n) = self.store.increment_hits(queried)? {
                hits = n;
            }
            if is_alias {
                if let Some(n) = self.store.increment_hits(&canonical)? {
                    canonical_hits = n;
                }
            } else {
                canonical_hits = hits;
            }
        }

        Ok(ResolvedDefinition {
            queried_term: queried.clone(),
            canonical_term: canonical,
            definition,
            author_id: first.author_id().clone(),
            hits,
            definition_author_id,
            canonical_hits,
        })
    }

    /// Delete every alias on a broken path.
    fn heal(&self, path: &[CanonicalTerm]) -> Result<(), StorageError> {
        for term in path {
            self.store.delete(term)?;
        }
        debug!(
            pruned = path.len(),
            terms = ?path.iter().map(CanonicalTerm::as_str).collect::<Vec<_>>(),
            "pruned broken alias chain"
        );
        Ok(())
    }

    /// Create `new_term` as an alias of `target`.
    ///
    /// # Errors
    /// Only store failures; rejections are [`SynonymCreation::Conflict`].
    pub fn add_synonym(
        &self,
        new_term: &CanonicalTerm,
        target: &CanonicalTerm,
        author: &AuthorId,
    ) -> Result<SynonymCreation, StorageError> {
        if new_term == target {
            return Ok(SynonymCreation::Conflict(SynonymConflict::SelfReference));
        }

        let new_known = self.store.exists(new_term)?;
        let target_known = self.store.exists(target)?;
        let conflict = match (new_known, target_known) {
            (true, true) => Some(SynonymConflict::BothKnown),
            (true, false) => Some(SynonymConflict::AliasTaken),
            (false, false) => Some(SynonymConflict::NeitherKnown),
            (false, true) => None,
        };
        if let Some(conflict) = conflict {
            return Ok(SynonymCreation::Conflict(conflict));
        }

        self.store.put_synonym(new_term, target, author)?;
        Ok(SynonymCreation::Created)
    }
}
