//! The knowledge store façade.
//!
//! [`KnowledgeStore`] combines the resolver, search index and lister over one
//! injected [`RecordStore`] and executes the intents produced by the command layer.
//! It holds no lock across the steps of an operation; concurrent handlers may
//! interleave, and the last write wins.

mod outcome;

pub use outcome::{
    ForgetOutcome, InfoOutcome, LookupOutcome, Outcome, RememberOutcome, SearchOutcome,
    SynonymOutcome, SynonymReason,
};

use std::sync::Arc;

use tracing::debug;

use crate::auth::Authorizer;
use crate::error::{GlossaryResult, ValidationError};
use crate::intent::{Intent, Requester};
use crate::listing::{RankedLister, TermListing, DEFAULT_SAMPLE_SIZE};
use crate::resolver::{SynonymConflict, SynonymCreation, SynonymResolver};
use crate::search::{SearchIndex, SearchKind};
use crate::storage::RecordStore;
use crate::term::CanonicalTerm;

/// Tunables for the façade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeStoreConfig {
    /// Corpora larger than this are listed as a ranked sample in shared channels.
    pub list_threshold: usize,
    /// Terms in a ranked sample.
    pub sample_size: usize,
}

impl Default for KnowledgeStoreConfig {
    fn default() -> Self {
        Self {
            list_threshold: DEFAULT_SAMPLE_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl KnowledgeStoreConfig {
    /// Check the configuration.
    ///
    /// # Errors
    /// `ValidationError::InvalidConfig` if `sample_size` is zero.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.sample_size == 0 {
            return Err(ValidationError::InvalidConfig {
                field: "sample_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

/// Glossary façade over a shared record store.
#[derive(Clone)]
pub struct KnowledgeStore {
    store: Arc<dyn RecordStore>,
    resolver: SynonymResolver,
    search: SearchIndex,
    lister: RankedLister,
    authorizer: Arc<dyn Authorizer>,
    config: KnowledgeStoreConfig,
}

impl KnowledgeStore {
    /// Create a store with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self::build(store, authorizer, KnowledgeStoreConfig::default())
    }

    /// Create a store with an explicit configuration.
    ///
    /// # Errors
    /// If the configuration does not validate.
    pub fn with_config(
        store: Arc<dyn RecordStore>,
        authorizer: Arc<dyn Authorizer>,
        config: KnowledgeStoreConfig,
    ) -> GlossaryResult<Self> {
        Ok(Self::build(store, authorizer, config.validate()?))
    }

    fn build(
        store: Arc<dyn RecordStore>,
        authorizer: Arc<dyn Authorizer>,
        config: KnowledgeStoreConfig,
    ) -> Self {
        Self {
            resolver: SynonymResolver::new(Arc::clone(&store)),
            search: SearchIndex::new(Arc::clone(&store)),
            lister: RankedLister::with_sample_size(Arc::clone(&store), config.sample_size),
            store,
            authorizer,
            config,
        }
    }

    /// The underlying record store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// The alias resolver.
    #[must_use]
    pub fn resolver(&self) -> &SynonymResolver {
        &self.resolver
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &KnowledgeStoreConfig {
        &self.config
    }

    /// Execute a parsed intent on behalf of `requester`.
    ///
    /// # Errors
    /// Blank terms or definitions, and store failures.
    pub fn execute(&self, intent: &Intent, requester: &Requester) -> GlossaryResult<Outcome> {
        debug!(intent = intent.name(), user = %requester.user_id, "executing intent");

        Ok(match intent {
            Intent::Lookup { term } => Outcome::Lookup(self.lookup(term)?),
            Intent::Info { term } => Outcome::Info(self.info(term)?),
            Intent::Remember { term, definition } => {
                Outcome::Remember(self.remember(term, definition, requester)?)
            }
            Intent::Synonym { term1, term2 } => {
                Outcome::Synonym(self.synonym(term1, term2, requester)?)
            }
            Intent::Forget { term } => Outcome::Forget(self.forget(term, requester)?),
            Intent::Search { kind, query } => Outcome::Search(self.search(*kind, query)?),
            Intent::ListAll => Outcome::ListAll(self.list_all(requester)?),
        })
    }

    /// "what is X?". Resolves aliases and counts a hit.
    ///
    /// # Errors
    /// Blank term, or a store failure.
    pub fn lookup(&self, term: &str) -> GlossaryResult<LookupOutcome> {
        let key = CanonicalTerm::new(term)?;
        let Some(resolved) = self.resolver.resolve_definition(&key, true)? else {
            return Ok(LookupOutcome::not_found(term));
        };

        Ok(LookupOutcome {
            queried_term: term.trim().to_string(),
            found: true,
            canonical_term: Some(resolved.canonical_term),
            definition: Some(resolved.definition),
            hits: Some(resolved.hits),
        })
    }

    /// "who added X?". Like lookup, but reports authorship and counts nothing.
    ///
    /// # Errors
    /// Blank term, or a store failure.
    pub fn info(&self, term: &str) -> GlossaryResult<InfoOutcome> {
        let key = CanonicalTerm::new(term)?;
        let Some(resolved) = self.resolver.resolve_definition(&key, false)? else {
            return Ok(InfoOutcome::not_found(term));
        };

        Ok(InfoOutcome {
            queried_term: term.trim().to_string(),
            found: true,
            is_alias: resolved.is_alias(),
            canonical_term: Some(resolved.canonical_term),
            definition: Some(resolved.definition),
            hits: resolved.hits,
            author_id: Some(resolved.author_id),
        })
    }

    /// "remember X is Y".
    ///
    /// Anyone may define a new term; only admins may overwrite a known one. A known
    /// term whose alias chain turns out to be broken is healed away and then
    /// written as new.
    ///
    /// # Errors
    /// Blank term or definition, or a store failure.
    pub fn remember(
        &self,
        term: &str,
        definition: &str,
        requester: &Requester,
    ) -> GlossaryResult<RememberOutcome> {
        let key = CanonicalTerm::new(term)?;
        let definition = definition.trim();
        if definition.is_empty() {
            return Err(ValidationError::EmptyDefinition.into());
        }

        if self.store.exists(&key)? && !self.authorizer.is_admin(requester) {
            if let Some(existing) = self.resolver.resolve_definition(&key, false)? {
                debug!(term = %key, user = %requester.user_id, "refusing overwrite by non-admin");
                return Ok(RememberOutcome {
                    term: term.trim().to_string(),
                    written: false,
                    blocked_because_existing: true,
                    canonical_term: existing.canonical_term,
                    definition: existing.definition,
                });
            }
        }

        self.store.put_definition(&key, definition, &requester.user_id)?;
        Ok(RememberOutcome {
            term: term.trim().to_string(),
            written: true,
            blocked_because_existing: false,
            canonical_term: key,
            definition: definition.to_string(),
        })
    }

    /// "X is also Y".
    ///
    /// Whichever side is unknown becomes an alias of the known side.
    ///
    /// # Errors
    /// Blank terms, or a store failure.
    pub fn synonym(
        &self,
        term1: &str,
        term2: &str,
        requester: &Requester,
    ) -> GlossaryResult<SynonymOutcome> {
        let key1 = CanonicalTerm::new(term1)?;
        let key2 = CanonicalTerm::new(term2)?;
        let rejected = |reason,
                        alias: Option<&CanonicalTerm>,
                        target: Option<&CanonicalTerm>| SynonymOutcome {
            created: false,
            reason,
            term1: term1.trim().to_string(),
            term2: term2.trim().to_string(),
            alias: alias.cloned(),
            target: target.cloned(),
        };

        if key1 == key2 {
            return Ok(rejected(SynonymReason::SelfReference, None, None));
        }

        let (alias, target) = match (self.store.exists(&key1)?, self.store.exists(&key2)?) {
            (true, true) => return Ok(rejected(SynonymReason::BothKnown, None, None)),
            (false, false) => return Ok(rejected(SynonymReason::NeitherKnown, None, None)),
            (true, false) => (key2, key1),
            (false, true) => (key1, key2),
        };

        match self.resolver.add_synonym(&alias, &target, &requester.user_id)? {
            SynonymCreation::Created => Ok(SynonymOutcome {
                created: true,
                reason: SynonymReason::Ok,
                term1: term1.trim().to_string(),
                term2: term2.trim().to_string(),
                alias: Some(alias),
                target: Some(target),
            }),
            SynonymCreation::Conflict(conflict) => {
                debug!(alias = %alias, target = %target, ?conflict, "alias lost a race");
                let reason = SynonymReason::from(conflict);
                Ok(if conflict == SynonymConflict::SelfReference {
                    rejected(reason, None, None)
                } else {
                    rejected(reason, Some(&alias), Some(&target))
                })
            }
        }
    }

    /// "forget X". Admins only.
    ///
    /// # Errors
    /// Blank term, or a store failure.
    pub fn forget(&self, term: &str, requester: &Requester) -> GlossaryResult<ForgetOutcome> {
        let key = CanonicalTerm::new(term)?;
        let outcome = |deleted, denied| ForgetOutcome {
            term: term.trim().to_string(),
            deleted,
            denied,
        };

        if !self.authorizer.is_admin(requester) {
            return Ok(outcome(false, true));
        }
        if !self.store.exists(&key)? {
            return Ok(outcome(false, false));
        }

        self.store.delete(&key)?;
        debug!(term = %key, user = %requester.user_id, "forgot term");
        Ok(outcome(true, false))
    }

    /// "search terms|definitions for Q".
    ///
    /// # Errors
    /// A store failure.
    pub fn search(&self, kind: SearchKind, query: &str) -> GlossaryResult<SearchOutcome> {
        let matches = self.search.search(kind, query)?;
        Ok(SearchOutcome {
            kind,
            query: query.to_string(),
            matches,
        })
    }

    /// "what do you remember?". Full list in private, ranked sample past the threshold.
    ///
    /// # Errors
    /// A store failure.
    pub fn list_all(&self, requester: &Requester) -> GlossaryResult<TermListing> {
        Ok(self
            .lister
            .list_all_terms(self.config.list_threshold, requester.private_channel)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAdmins;
    use crate::storage::InMemoryRecordStore;

    fn glossary() -> KnowledgeStore {
        KnowledgeStore::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(StaticAdmins::new(["admin"])),
        )
    }

    fn admin() -> Requester {
        Requester::new("admin")
    }

    fn user() -> Requester {
        Requester::new("bob").display_name("Bob")
    }

    #[test]
    fn remember_then_lookup() {
        let g = glossary();
        let written = g.remember("Rust", " a systems language ", &user()).unwrap();
        assert!(written.written);
        assert_eq!(written.definition, "a systems language");

        let found = g.lookup("  RUST ").unwrap();
        assert!(found.found);
        assert_eq!(found.queried_term, "RUST");
        assert_eq!(found.definition.as_deref(), Some("a systems language"));
        assert_eq!(found.hits, Some(1));
    }

    #[test]
    fn non_admin_cannot_overwrite() {
        let g = glossary();
        g.remember("rust", "a systems language", &user()).unwrap();

        let blocked = g.remember("rust", "a fungus", &user()).unwrap();
        assert!(!blocked.written);
        assert!(blocked.blocked_because_existing);
        assert_eq!(blocked.definition, "a systems language");

        let overwritten = g.remember("rust", "a fungus", &admin()).unwrap();
        assert!(overwritten.written);
        assert_eq!(g.lookup("rust").unwrap().definition.as_deref(), Some("a fungus"));
    }

    #[test]
    fn blocked_remember_reports_the_aliased_definition() {
        let g = glossary();
        g.remember("rust", "a systems language", &user()).unwrap();
        g.synonym("rust", "rustlang", &user()).unwrap();

        let blocked = g.remember("rustlang", "something else", &user()).unwrap();
        assert!(blocked.blocked_because_existing);
        assert_eq!(blocked.canonical_term.as_str(), "rust");
    }

    #[test]
    fn broken_alias_can_be_redefined_by_anyone() {
        let g = glossary();
        g.remember("rust", "a systems language", &user()).unwrap();
        g.synonym("rustlang", "rust", &user()).unwrap();
        g.store().delete(&CanonicalTerm::new("rust").unwrap()).unwrap();

        let written = g.remember("rustlang", "its own thing", &user()).unwrap();
        assert!(written.written);
    }

    #[test]
    fn remember_rejects_blank_input() {
        let g = glossary();
        assert!(g.remember("  ", "x", &user()).unwrap_err().is_validation());
        assert!(g.remember("x", "   ", &user()).unwrap_err().is_validation());
    }

    #[test]
    fn synonym_picks_direction_from_known_side() {
        let g = glossary();
        g.remember("rust", "a systems language", &user()).unwrap();

        let forward = g.synonym("rust", "rustlang", &user()).unwrap();
        assert!(forward.created);
        assert_eq!(forward.alias.unwrap().as_str(), "rustlang");
        assert_eq!(forward.target.unwrap().as_str(), "rust");

        let backward = g.synonym("rs", "rust", &user()).unwrap();
        assert!(backward.created);
        assert_eq!(backward.alias.unwrap().as_str(), "rs");
    }

    #[test]
    fn synonym_conflicts() {
        let g = glossary();
        g.remember("x", "dx", &user()).unwrap();
        g.remember("y", "dy", &user()).unwrap();

        assert_eq!(g.synonym("x", "y", &user()).unwrap().reason, SynonymReason::BothKnown);
        assert_eq!(g.synonym("p", "q", &user()).unwrap().reason, SynonymReason::NeitherKnown);
        assert_eq!(g.synonym("X", "x", &user()).unwrap().reason, SynonymReason::SelfReference);
    }

    #[test]
    fn info_reports_alias_and_author() {
        let g = glossary();
        g.remember("rust", "a systems language", &admin()).unwrap();
        g.synonym("rust", "rustlang", &user()).unwrap();
        g.lookup("rustlang").unwrap();

        let info = g.info("rustlang").unwrap();
        assert!(info.found);
        assert!(info.is_alias);
        assert_eq!(info.canonical_term.unwrap().as_str(), "rust");
        assert_eq!(info.author_id.unwrap().as_str(), "bob");
        assert_eq!(info.hits, 1);

        // Info does not count.
        assert_eq!(g.info("rustlang").unwrap().hits, 1);
        assert!(!g.info("nothing").unwrap().found);
    }

    #[test]
    fn forget_is_admin_only() {
        let g = glossary();
        g.remember("rust", "a systems language", &user()).unwrap();

        let denied = g.forget("rust", &user()).unwrap();
        assert!(denied.denied);
        assert!(!denied.deleted);
        assert!(g.lookup("rust").unwrap().found);

        assert!(g.forget("rust", &admin()).unwrap().deleted);
        let again = g.forget("rust", &admin()).unwrap();
        assert!(!again.deleted);
        assert!(!again.denied);
    }

    #[test]
    fn list_all_respects_private_channel() {
        let g = KnowledgeStore::with_config(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(StaticAdmins::default()),
            KnowledgeStoreConfig {
                list_threshold: 2,
                sample_size: 1,
            },
        )
        .unwrap();
        for t in ["a", "b", "c"] {
            g.remember(t, "d", &user()).unwrap();
        }
        g.lookup("c").unwrap();

        assert_eq!(
            g.list_all(&user()).unwrap(),
            TermListing::RankedSample {
                sampled_terms: vec![CanonicalTerm::new("c").unwrap()],
                total_count: 3,
            }
        );
        assert_eq!(g.list_all(&user().in_private()).unwrap().terms().len(), 3);
    }

    #[test]
    fn execute_dispatches_every_intent() {
        let g = glossary();
        let u = user();
        let run = |intent: Intent| g.execute(&intent, &u).unwrap();

        assert!(matches!(
            run(Intent::Remember { term: "rust".into(), definition: "a language".into() }),
            Outcome::Remember(RememberOutcome { written: true, .. })
        ));
        assert!(matches!(
            run(Intent::Synonym { term1: "rust".into(), term2: "rustlang".into() }),
            Outcome::Synonym(SynonymOutcome { created: true, .. })
        ));
        assert!(matches!(
            run(Intent::Lookup { term: "rustlang".into() }),
            Outcome::Lookup(LookupOutcome { found: true, .. })
        ));
        assert!(matches!(
            run(Intent::Info { term: "rust".into() }),
            Outcome::Info(InfoOutcome { found: true, is_alias: false, .. })
        ));
        assert!(matches!(
            run(Intent::Search { kind: SearchKind::Terms, query: "rust".into() }),
            Outcome::Search(SearchOutcome { ref matches, .. }) if matches.len() == 2
        ));
        assert!(matches!(run(Intent::ListAll), Outcome::ListAll(TermListing::FullList { .. })));
        assert!(matches!(
            run(Intent::Forget { term: "rust".into() }),
            Outcome::Forget(ForgetOutcome { denied: true, .. })
        ));
    }

    #[test]
    fn zero_sample_size_is_rejected() {
        let result = KnowledgeStore::with_config(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(StaticAdmins::default()),
            KnowledgeStoreConfig {
                list_threshold: 10,
                sample_size: 0,
            },
        );
        assert!(matches!(result, Err(e) if e.is_validation()));
    }
}
