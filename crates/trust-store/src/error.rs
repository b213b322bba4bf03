//! Error types for document store operations.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this ID.
    #[error("record not found: {collection}/{id}")]
    NotFound {
        /// Collection searched.
        collection: String,
        /// Missing record ID.
        id: String,
    },

    /// A record with this ID already exists.
    #[error("record already exists: {collection}/{id}")]
    Conflict {
        /// Collection written.
        collection: String,
        /// Duplicate record ID.
        id: String,
    },

    /// The store cannot be reached.
    #[error("document store unavailable: {message}")]
    Unavailable {
        /// Description of the outage.
        message: String,
    },

    /// A filter expression failed to parse.
    #[error("invalid filter at offset {offset}: {message}")]
    InvalidFilter {
        /// Byte offset of the problem.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// A record does not have the shape its type expects.
    #[error("cannot decode {collection}/{id}: {message}")]
    Decode {
        /// Collection of the record.
        collection: String,
        /// Record ID.
        id: String,
        /// Decoder message.
        message: String,
    },

    /// A value could not be encoded as record fields.
    #[error("cannot encode fields: {message}")]
    Encode {
        /// Encoder message.
        message: String,
    },
}

impl StoreError {
    /// Create a not-found error.
    #[must_use]
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether the error means the store could not be reached.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
