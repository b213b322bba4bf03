//! Transaction log entries for TRH awards and spends.

use crate::amount::Amount;
use crate::error::{Result, TokenError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique transaction identifier, `trh_<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create a new random transaction ID.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("trh_{}", Uuid::new_v4().simple()))
    }

    /// Create from a string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the ID as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Waiting for ledger confirmation.
    Pending,
    /// Confirmed by the ledger; balance delta applied.
    Confirmed,
    /// Ledger call failed; no balance delta applied.
    Failed,
}

impl TransactionStatus {
    /// Check if the transaction is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Tokens credited to the wallet.
    Earning,
    /// Tokens debited from the wallet.
    Spending,
}

/// What a transaction pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Reward for a submitted review.
    ReviewReward,
    /// One-time identity verification bonus.
    VerificationBonus,
    /// Daily activity streak milestone.
    StreakBonus,
    /// Spend on a business promotion.
    PromotionPayment,
    /// Unlocked achievement.
    AchievementReward,
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReviewReward => write!(f, "review_reward"),
            Self::VerificationBonus => write!(f, "verification_bonus"),
            Self::StreakBonus => write!(f, "streak_bonus"),
            Self::PromotionPayment => write!(f, "promotion_payment"),
            Self::AchievementReward => write!(f, "achievement_reward"),
        }
    }
}

/// One entry in a wallet's transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTransaction {
    /// Unique transaction ID.
    pub id: TransactionId,
    /// Earning or spending.
    pub kind: TransactionKind,
    /// Signed amount: positive for earnings, negative for spends.
    pub amount: i64,
    /// Human-readable description.
    pub description: String,
    /// What the transaction pays for.
    pub context_type: ContextType,
    /// Related entity, e.g. a review ID.
    pub context_id: Option<String>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Current status.
    pub status: TransactionStatus,
    /// Ledger transaction hash once confirmed.
    pub tx_hash: Option<String>,
    /// Failure reason.
    pub error: Option<String>,
}

impl TokenTransaction {
    /// Create a pending earning.
    #[must_use]
    pub fn earning(
        amount: Amount,
        description: impl Into<String>,
        context_type: ContextType,
        context_id: Option<String>,
    ) -> Self {
        Self::pending(TransactionKind::Earning, amount, description, context_type, context_id)
    }

    /// Create a pending spend.
    #[must_use]
    pub fn spending(
        amount: Amount,
        description: impl Into<String>,
        context_type: ContextType,
        context_id: Option<String>,
    ) -> Self {
        Self::pending(TransactionKind::Spending, amount, description, context_type, context_id)
    }

    fn pending(
        kind: TransactionKind,
        amount: Amount,
        description: impl Into<String>,
        context_type: ContextType,
        context_id: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            kind,
            amount: amount.signed(kind == TransactionKind::Spending),
            description: description.into(),
            context_type,
            context_id,
            timestamp: Utc::now(),
            status: TransactionStatus::Pending,
            tx_hash: None,
            error: None,
        }
    }

    /// Unsigned magnitude of the amount.
    #[must_use]
    pub fn magnitude(&self) -> Amount {
        Amount::from_tokens(self.amount.unsigned_abs())
    }

    /// Mark the transaction confirmed by the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::TransactionFinalized`] if already terminal.
    pub fn confirm(&mut self, tx_hash: impl Into<String>) -> Result<()> {
        self.ensure_pending()?;
        self.status = TransactionStatus::Confirmed;
        self.tx_hash = Some(tx_hash.into());
        Ok(())
    }

    /// Mark the transaction failed.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::TransactionFinalized`] if already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.ensure_pending()?;
        self.status = TransactionStatus::Failed;
        self.error = Some(reason.into());
        Ok(())
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(TokenError::TransactionFinalized {
                id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }
}
