//! Per-wallet token balance.

use crate::amount::Amount;
use crate::error::{Result, TokenError};
use serde::{Deserialize, Serialize};

/// Balance of one wallet.
///
/// `available` always equals `earned - spent`. `locked` is reserved for
/// staking and is not debited from `available`. The fields are only changed
/// through [`credit`](Self::credit) and [`debit`](Self::debit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Spendable tokens.
    pub available: Amount,
    /// Lifetime earnings.
    pub earned: Amount,
    /// Lifetime spending.
    pub spent: Amount,
    /// Tokens held for staking.
    pub locked: Amount,
}

impl TokenBalance {
    /// Apply an earning.
    pub fn credit(&mut self, amount: Amount) {
        self.available = self.available.saturating_add(amount);
        self.earned = self.earned.saturating_add(amount);
    }

    /// Apply a spend. Leaves the balance untouched when `available` is short.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InsufficientBalance`] when `amount > available`.
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        let available = self.available.checked_sub(amount).ok_or_else(|| {
            TokenError::insufficient_balance(amount.tokens(), self.available.tokens())
        })?;
        self.available = available;
        self.spent = self.spent.saturating_add(amount);
        Ok(())
    }

    /// Check the `available == earned - spent` invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.earned.checked_sub(self.spent) == Some(self.available)
    }
}
