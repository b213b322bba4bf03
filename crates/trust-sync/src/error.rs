//! Error types for reconciliation.

use thiserror::Error;
use trust_core::CoreError;
use trust_store::StoreError;
use trust_token::TokenError;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised while reconciling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// `start` was called on a running service.
    #[error("reconciliation service is already running")]
    AlreadyRunning,

    /// A change event carried a record that could not be decoded.
    #[error("invalid {collection} record {id}: {message}")]
    InvalidRecord {
        /// Source collection.
        collection: String,
        /// Record ID.
        id: String,
        /// Decode failure.
        message: String,
    },

    /// Domain failure, e.g. a rollup recompute.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Ledger failure.
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl SyncError {
    /// Whether an external dependency failed.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        match self {
            Self::Core(e) => e.is_upstream(),
            Self::Store(e) => e.is_unavailable(),
            Self::Token(e) => e.is_upstream(),
            _ => false,
        }
    }
}
