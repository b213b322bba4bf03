//! Queued reconciliation operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use trust_token::WalletAddress;

/// Scheduling priority. Higher variants are dequeued first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Balance refreshes after transfers.
    Low,
    /// Attestations and mints.
    Medium,
    /// Review confirmations.
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Operation type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Mark reviews as anchored on the ledger.
    ReviewBlockchainConfirmed,
    /// Stamp reviews with their attestation.
    ReviewVerified,
    /// Overwrite a cached balance from the ledger.
    UpdateUserBalance,
}

impl SyncKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReviewBlockchainConfirmed => "review_blockchain_confirmed",
            Self::ReviewVerified => "review_verified",
            Self::UpdateUserBalance => "update_user_balance",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A corrective write and its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncOperation {
    /// The ledger accepted a review.
    ReviewBlockchainConfirmed {
        /// Ledger reference stored on the review.
        blockchain_id: String,
        /// Anchoring transaction.
        tx_hash: String,
        /// Content hash the ledger recorded.
        content_hash: String,
        /// When the confirmation was observed.
        confirmed_at: DateTime<Utc>,
    },
    /// A verifier attested a review.
    ReviewVerified {
        /// Ledger reference stored on the review.
        blockchain_id: String,
        /// Attesting wallet.
        verifier: WalletAddress,
        /// Attestation time reported by the ledger.
        verified_at: DateTime<Utc>,
    },
    /// A wallet's ledger balance changed.
    UpdateUserBalance {
        /// Affected wallet.
        wallet: WalletAddress,
    },
}

impl SyncOperation {
    /// Type tag of this operation.
    #[must_use]
    pub const fn kind(&self) -> SyncKind {
        match self {
            Self::ReviewBlockchainConfirmed { .. } => SyncKind::ReviewBlockchainConfirmed,
            Self::ReviewVerified { .. } => SyncKind::ReviewVerified,
            Self::UpdateUserBalance { .. } => SyncKind::UpdateUserBalance,
        }
    }
}

/// An operation waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Sequence number, unique per service.
    pub id: u64,
    /// What to do.
    pub operation: SyncOperation,
    /// Scheduling priority.
    pub priority: Priority,
    /// Enqueue time.
    pub enqueued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_order() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_operation_serialization() {
        let op = SyncOperation::UpdateUserBalance {
            wallet: WalletAddress::parse("alice").expect("addr"),
        };
        assert_eq!(
            serde_json::to_value(&op).expect("serialize"),
            json!({ "type": "update_user_balance", "wallet": "alice" })
        );
        assert_eq!(op.kind().to_string(), "update_user_balance");
    }
}
