//! # trust-token
//!
//! TRH, the TrustHub reward token.
//!
//! This crate provides:
//! - Token amounts and per-wallet balances
//! - Wallet addresses and ed25519 signature verification
//! - The append-only, bounded transaction log
//! - [`TokenLedger`], the per-wallet balance store behind `award` and `spend`
//! - [`LedgerClient`], the seam to the external ledger, with a simulated backend
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trust_token::{Amount, ContextType, LedgerConfig, SimulatedLedger, TokenLedger, WalletAddress};
//!
//! # async fn example() -> trust_token::Result<()> {
//! let ledger = TokenLedger::new(Arc::new(SimulatedLedger::new()), LedgerConfig::default());
//! let wallet = WalletAddress::parse("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU")?;
//!
//! ledger
//!     .award(&wallet, Amount::from_tokens(27), "Review reward", ContextType::ReviewReward, None)
//!     .await?;
//! println!("available: {}", ledger.balance(&wallet).available);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod balance;
pub mod client;
pub mod error;
pub mod ledger;
pub mod transaction;
pub mod wallet;

pub use amount::Amount;
pub use balance::TokenBalance;
pub use client::{LedgerClient, LedgerEvent, ReviewSubmission, SimulatedLedger};
pub use error::{Result, TokenError};
pub use ledger::{LedgerConfig, TokenLedger};
pub use transaction::{ContextType, TokenTransaction, TransactionId, TransactionKind, TransactionStatus};
pub use wallet::{Wallet, WalletAddress};

/// Ticker symbol of the reward token.
pub const TOKEN_SYMBOL: &str = "TRH";

/// Maximum number of transactions kept per wallet.
pub const TRANSACTION_LOG_CAPACITY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(TOKEN_SYMBOL, "TRH");
        assert_eq!(TRANSACTION_LOG_CAPACITY, 100);
    }
}
