//! TRH token amount representation.
//!
//! Rewards and prices are whole tokens, so an [`Amount`] is a plain count of
//! TRH with checked and saturating arithmetic.

use crate::TOKEN_SYMBOL;
use crate::error::{Result, TokenError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of TRH tokens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount {
    tokens: u64,
}

impl Amount {
    /// Zero TRH.
    pub const ZERO: Self = Self { tokens: 0 };

    /// Create an amount from a whole number of tokens.
    #[must_use]
    pub const fn from_tokens(tokens: u64) -> Self {
        Self { tokens }
    }

    /// Create a non-zero amount, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidAmount`] for zero.
    pub fn non_zero(tokens: u64) -> Result<Self> {
        if tokens == 0 {
            return Err(TokenError::InvalidAmount {
                message: "amount must be greater than zero".to_string(),
            });
        }
        Ok(Self { tokens })
    }

    /// Number of whole tokens.
    #[must_use]
    pub const fn tokens(&self) -> u64 {
        self.tokens
    }

    /// Check if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.tokens == 0
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(&self, other: Self) -> Self {
        Self {
            tokens: self.tokens.saturating_add(other.tokens),
        }
    }

    /// Saturating subtraction.
    #[must_use]
    pub const fn saturating_sub(&self, other: Self) -> Self {
        Self {
            tokens: self.tokens.saturating_sub(other.tokens),
        }
    }

    /// Checked addition.
    #[must_use]
    pub const fn checked_add(&self, other: Self) -> Option<Self> {
        match self.tokens.checked_add(other.tokens) {
            Some(tokens) => Some(Self { tokens }),
            None => None,
        }
    }

    /// Checked subtraction.
    #[must_use]
    pub const fn checked_sub(&self, other: Self) -> Option<Self> {
        match self.tokens.checked_sub(other.tokens) {
            Some(tokens) => Some(Self { tokens }),
            None => None,
        }
    }

    /// Signed value for transaction logs; spending is negative.
    #[must_use]
    pub fn signed(&self, negative: bool) -> i64 {
        let magnitude = i64::try_from(self.tokens).unwrap_or(i64::MAX);
        if negative { -magnitude } else { magnitude }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {TOKEN_SYMBOL}", self.tokens)
    }
}

impl From<u64> for Amount {
    fn from(tokens: u64) -> Self {
        Self::from_tokens(tokens)
    }
}
