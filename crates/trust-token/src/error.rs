//! Error types for TRH token operations.

use thiserror::Error;

/// Result type alias for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed wallet address.
    #[error("invalid address: {message}")]
    InvalidAddress {
        /// Description of the address error.
        message: String,
    },

    /// Signature could not be decoded or does not match the message.
    #[error("invalid signature: {message}")]
    InvalidSignature {
        /// Description of the signature error.
        message: String,
    },

    /// Spend exceeds the available balance.
    #[error("insufficient TRH balance: available {available}, required {required}")]
    InsufficientBalance {
        /// Amount the spend asked for.
        required: u64,
        /// Amount available at the time of the check.
        available: u64,
    },

    /// Invalid amount.
    #[error("invalid amount: {message}")]
    InvalidAmount {
        /// Description of the amount error.
        message: String,
    },

    /// The external ledger rejected the call or could not be reached.
    #[error("ledger error: {message}")]
    Ledger {
        /// Description of the ledger failure.
        message: String,
    },

    /// A confirmed or failed transaction cannot change status again.
    #[error("transaction {id} is already {status}")]
    TransactionFinalized {
        /// Transaction ID.
        id: String,
        /// Terminal status.
        status: String,
    },

    /// Wallet key material error.
    #[error("wallet error: {message}")]
    Wallet {
        /// Description of the wallet error.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TokenError {
    /// Create an invalid address error.
    #[must_use]
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }

    /// Create an invalid signature error.
    #[must_use]
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature {
            message: message.into(),
        }
    }

    /// Create an insufficient balance error.
    #[must_use]
    pub const fn insufficient_balance(required: u64, available: u64) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    /// Create a ledger error.
    #[must_use]
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Whether the error came from the external ledger rather than the caller.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Ledger { .. })
    }
}
