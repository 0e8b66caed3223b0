//! Structured requests handed to the knowledge store by the command layer.
//!
//! The command layer owns text parsing; by the time a request reaches the store it
//! is one of a closed set of intents with named fields.

use serde::{Deserialize, Serialize};

use crate::search::SearchKind;
use crate::term::AuthorId;

/// Who is asking, as reported by the chat framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Opaque user identity; becomes the author of anything written.
    pub user_id: AuthorId,
    /// Name shown in replies.
    pub display_name: String,
    /// True for direct/private conversations, where listings are never truncated.
    #[serde(default)]
    pub private_channel: bool,
}

impl Requester {
    /// A requester in a shared channel whose display name is their id.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        let id = user_id.into();
        Self {
            display_name: id.clone(),
            user_id: AuthorId::new(id),
            private_channel: false,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Mark the request as coming from a private conversation.
    #[must_use]
    pub fn in_private(mut self) -> Self {
        self.private_channel = true;
        self
    }
}

/// A parsed command.
///
/// Terms are carried as typed; the store normalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "camelCase")]
pub enum Intent {
    /// "what is X?". Counts a hit.
    Lookup {
        /// Term as typed.
        term: String,
    },
    /// "who added X?". Does not count a hit.
    Info {
        /// Term as typed.
        term: String,
    },
    /// "remember X is Y".
    Remember {
        /// Term as typed.
        term: String,
        /// Definition text.
        definition: String,
    },
    /// "X is also Y", in either direction.
    Synonym {
        /// Left-hand term.
        term1: String,
        /// Right-hand term.
        term2: String,
    },
    /// "forget X".
    Forget {
        /// Term as typed.
        term: String,
    },
    /// "search terms|definitions for Q".
    Search {
        /// What to match against.
        kind: SearchKind,
        /// Substring to look for.
        query: String,
    },
    /// "what do you remember?".
    ListAll,
}

impl Intent {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Lookup { .. } => "lookup",
            Self::Info { .. } => "info",
            Self::Remember { .. } => "remember",
            Self::Synonym { .. } => "synonym",
            Self::Forget { .. } => "forget",
            Self::Search { .. } => "search",
            Self::ListAll => "list_all",
        }
    }
}
