//! Term records and canonical keys.
//!
//! Every term is stored under its canonical key: the trimmed, lower-cased form of
//! whatever the user typed. A record is either a definition or a synonym (alias)
//! pointing at another canonical key, never both.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Case-folded, trimmed key identifying a term's storage slot.
///
/// # Examples
///
/// ```
/// use glossary::CanonicalTerm;
///
/// let term = CanonicalTerm::new("  Rust ").unwrap();
/// assert_eq!(term.as_str(), "rust");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalTerm(String);

impl CanonicalTerm {
    /// Normalizes `raw` into a canonical key.
    ///
    /// # Errors
    /// Returns `ValidationError::EmptyTerm` if nothing is left after trimming.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return Err(ValidationError::EmptyTerm);
        }
        Ok(Self(key))
    }

    /// Returns the canonical key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalTerm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CanonicalTerm {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl TryFrom<&str> for CanonicalTerm {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CanonicalTerm> for String {
    fn from(term: CanonicalTerm) -> Self {
        term.0
    }
}

/// Opaque identity of the user who wrote a record.
///
/// Supplied by the chat framework's identity layer; the store never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(String);

impl AuthorId {
    /// Wraps an identity string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AuthorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AuthorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A stored term.
///
/// Serialized untagged, so the variant is decided by field presence:
/// `definition` for a definition, `synonym_of` for an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermRecord {
    /// The term's own definition.
    Definition {
        /// Definition text as written by the author.
        definition: String,
        /// Who wrote it.
        author_id: AuthorId,
        /// Successful lookups since (re)creation.
        hits: u64,
    },
    /// An alias deferring to another term.
    Synonym {
        /// Key of the aliased term. May be dangling.
        synonym_of: CanonicalTerm,
        /// Who created the alias.
        author_id: AuthorId,
        /// Successful lookups through this alias since creation.
        hits: u64,
    },
}

impl TermRecord {
    /// Creates a fresh definition record with a zero hit count.
    #[must_use]
    pub fn definition(definition: impl Into<String>, author_id: AuthorId) -> Self {
        Self::Definition {
            definition: definition.into(),
            author_id,
            hits: 0,
        }
    }

    /// Creates a fresh synonym record with a zero hit count.
    #[must_use]
    pub fn synonym(target: CanonicalTerm, author_id: AuthorId) -> Self {
        Self::Synonym {
            synonym_of: target,
            author_id,
            hits: 0,
        }
    }

    /// Hit count of this record.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        match self {
            Self::Definition { hits, .. } | Self::Synonym { hits, .. } => *hits,
        }
    }

    /// Author of this record.
    #[must_use]
    pub const fn author_id(&self) -> &AuthorId {
        match self {
            Self::Definition { author_id, .. } | Self::Synonym { author_id, .. } => author_id,
        }
    }

    /// Definition text, if this is a definition record.
    #[must_use]
    pub fn definition_text(&self) -> Option<&str> {
        match self {
            Self::Definition { definition, .. } => Some(definition),
            Self::Synonym { .. } => None,
        }
    }

    /// Alias target, if this is a synonym record.
    #[must_use]
    pub const fn synonym_target(&self) -> Option<&CanonicalTerm> {
        match self {
            Self::Synonym { synonym_of, .. } => Some(synonym_of),
            Self::Definition { .. } => None,
        }
    }

    /// Returns true for synonym records.
    #[must_use]
    pub const fn is_synonym(&self) -> bool {
        matches!(self, Self::Synonym { .. })
    }

    /// Bumps the hit counter, saturating, and returns the new value.
    pub fn bump_hits(&mut self) -> u64 {
        match self {
            Self::Definition { hits, .. } | Self::Synonym { hits, .. } => {
                *hits = hits.saturating_add(1);
                *hits
            }
        }
    }
}
