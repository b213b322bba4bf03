//! Error types for the review domain.

use thiserror::Error;
use trust_store::StoreError;
use trust_token::TokenError;

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by domain operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Caller input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"business"`.
        kind: &'static str,
        /// Requested ID.
        id: String,
    },

    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Token ledger failure, including insufficient balance.
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl CoreError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether an external dependency (store or ledger) failed.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        match self {
            Self::Store(e) => e.is_unavailable(),
            Self::Token(e) => e.is_upstream(),
            _ => false,
        }
    }

    /// Map a store not-found into a domain not-found for `kind`.
    pub(crate) fn from_lookup(kind: &'static str, id: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::not_found(kind, id),
            other => Self::Store(other),
        }
    }
}
