//! Error types for the glossary.
//!
//! All errors are strongly typed using thiserror. Unknown terms, alias conflicts
//! and refused writes are not errors: they come back as outcome values so the
//! command layer can phrase them. What remains here is bad input and a backing
//! store that could not do its job.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors that occur during input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Term cannot be empty")]
    EmptyTerm,

    #[error("Definition cannot be empty")]
    EmptyDefinition,

    #[error("Configuration value '{field}' is invalid: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

/// Top-level error type for the glossary.
#[derive(Debug, Error)]
pub enum GlossaryError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl GlossaryError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the backing store failed.
    #[must_use]
    pub const fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Returns true if the caller may report this as transient and try again later.
    ///
    /// The glossary itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Internal { .. } => false,
            Self::StoreUnavailable(e) => !matches!(e, StorageError::Serialization(_)),
        }
    }
}

/// Result type alias for glossary operations.
pub type GlossaryResult<T> = Result<T, GlossaryError>;
