//! Per-wallet balance store.
//!
//! [`TokenLedger`] owns every wallet's [`TokenBalance`] and transaction log.
//! `award` and `spend` for one wallet run under that wallet's async lock, so
//! the balance check, the confirmation wait and the delta are one critical
//! section. Different wallets proceed independently.

use crate::TRANSACTION_LOG_CAPACITY;
use crate::amount::Amount;
use crate::balance::TokenBalance;
use crate::client::LedgerClient;
use crate::error::{Result, TokenError};
use crate::transaction::{ContextType, TokenTransaction, TransactionId};
use crate::wallet::WalletAddress;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use trust_persist::JsonStore;

/// Timing and retention settings for [`TokenLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Wait before an award is confirmed.
    pub award_delay: Duration,
    /// Wait before a spend is confirmed.
    pub spend_delay: Duration,
    /// Transactions kept per wallet, newest first.
    pub log_capacity: usize,
}

impl LedgerConfig {
    /// Config with no confirmation waits.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            award_delay: Duration::ZERO,
            spend_delay: Duration::ZERO,
            log_capacity: TRANSACTION_LOG_CAPACITY,
        }
    }

    /// Set the award confirmation wait.
    #[must_use]
    pub const fn with_award_delay(mut self, delay: Duration) -> Self {
        self.award_delay = delay;
        self
    }

    /// Set the spend confirmation wait.
    #[must_use]
    pub const fn with_spend_delay(mut self, delay: Duration) -> Self {
        self.spend_delay = delay;
        self
    }

    /// Set the per-wallet log capacity.
    #[must_use]
    pub const fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            award_delay: Duration::from_secs(1),
            spend_delay: Duration::from_secs(2),
            log_capacity: TRANSACTION_LOG_CAPACITY,
        }
    }
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<WalletAddress, TokenBalance>,
    logs: HashMap<WalletAddress, Vec<TokenTransaction>>,
}

struct Snapshots {
    balances: JsonStore,
    transactions: JsonStore,
}

/// Token balance store.
pub struct TokenLedger<L> {
    client: Arc<L>,
    config: LedgerConfig,
    wallet_locks: Mutex<HashMap<WalletAddress, Arc<tokio::sync::Mutex<()>>>>,
    state: Mutex<LedgerState>,
    snapshots: Option<Snapshots>,
}

impl<L: LedgerClient> TokenLedger<L> {
    /// Create an in-memory store.
    pub fn new(client: Arc<L>, config: LedgerConfig) -> Self {
        Self {
            client,
            config,
            wallet_locks: Mutex::new(HashMap::new()),
            state: Mutex::new(LedgerState::default()),
            snapshots: None,
        }
    }

    /// Create a store persisted under `state_path`, loading existing snapshots.
    pub fn open(client: Arc<L>, config: LedgerConfig, state_path: &Path) -> Self {
        let snapshots = Snapshots {
            balances: JsonStore::new(state_path, "trh_balance"),
            transactions: JsonStore::new(state_path, "trh_transactions"),
        };
        let state = LedgerState {
            balances: snapshots.balances.load(),
            logs: snapshots.transactions.load(),
        };
        debug!(wallets = state.balances.len(), "loaded token balances from disk");

        Self {
            snapshots: Some(snapshots),
            state: Mutex::new(state),
            ..Self::new(client, config)
        }
    }

    /// The ledger client behind this store.
    pub fn client(&self) -> &Arc<L> {
        &self.client
    }

    /// Current balance of a wallet; zero for unknown wallets.
    pub fn balance(&self, wallet: &WalletAddress) -> TokenBalance {
        self.state
            .lock()
            .balances
            .get(wallet)
            .copied()
            .unwrap_or_default()
    }

    /// Newest-first transactions of a wallet, at most `limit`.
    pub fn transactions(&self, wallet: &WalletAddress, limit: usize) -> Vec<TokenTransaction> {
        self.state
            .lock()
            .logs
            .get(wallet)
            .map(|log| log.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Credit `amount` to a wallet.
    ///
    /// The transaction is logged as pending, confirmed after the award delay
    /// once the ledger accepts the mint, and only then applied to the balance.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidAmount`] for zero, or
    /// [`TokenError::Ledger`] if the mint fails; the transaction is then
    /// logged as failed and no delta is applied.
    pub async fn award(
        &self,
        wallet: &WalletAddress,
        amount: Amount,
        description: &str,
        context_type: ContextType,
        context_id: Option<String>,
    ) -> Result<TokenTransaction> {
        let lock = self.wallet_lock(wallet);
        let _guard = lock.lock().await;
        self.award_locked(wallet, amount, description, context_type, context_id)
            .await
    }

    /// Debit `amount` from a wallet.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InsufficientBalance`] without any mutation when
    /// `amount` exceeds the available balance, [`TokenError::InvalidAmount`]
    /// for zero, or [`TokenError::Ledger`] if the burn fails.
    pub async fn spend(
        &self,
        wallet: &WalletAddress,
        amount: Amount,
        description: &str,
        context_type: ContextType,
        context_id: Option<String>,
    ) -> Result<TokenTransaction> {
        let amount = Amount::non_zero(amount.tokens())?;
        let lock = self.wallet_lock(wallet);
        let _guard = lock.lock().await;

        let available = self.balance(wallet).available;
        if available < amount {
            return Err(TokenError::insufficient_balance(
                amount.tokens(),
                available.tokens(),
            ));
        }

        let mut tx = TokenTransaction::spending(amount, description, context_type, context_id);
        self.record(wallet, &tx);
        tokio::time::sleep(self.config.spend_delay).await;

        match self.client.burn(wallet, amount, description).await {
            Ok(tx_hash) => {
                tx.confirm(tx_hash)?;
                self.apply(wallet, &tx, |balance| balance.debit(amount))?;
                info!(wallet = %wallet, amount = %amount, context = %context_type, "tokens spent");
                Ok(tx)
            }
            Err(e) => {
                self.fail(wallet, &mut tx, &e)?;
                Err(e)
            }
        }
    }

    /// Award the one-time identity verification bonus.
    ///
    /// Pays only if the wallet is verified and has never earned anything.
    /// Returns `None` when no bonus was due.
    pub async fn initialize_with_verification_bonus(
        &self,
        wallet: &WalletAddress,
        verified: bool,
        bonus: Amount,
    ) -> Result<Option<TokenTransaction>> {
        if !verified {
            return Ok(None);
        }
        let lock = self.wallet_lock(wallet);
        let _guard = lock.lock().await;

        if !self.balance(wallet).earned.is_zero() {
            debug!(wallet = %wallet, "verification bonus already settled");
            return Ok(None);
        }
        self.award_locked(
            wallet,
            bonus,
            "Identity verification bonus",
            ContextType::VerificationBonus,
            None,
        )
        .await
        .map(Some)
    }

    async fn award_locked(
        &self,
        wallet: &WalletAddress,
        amount: Amount,
        description: &str,
        context_type: ContextType,
        context_id: Option<String>,
    ) -> Result<TokenTransaction> {
        let amount = Amount::non_zero(amount.tokens())?;
        let mut tx = TokenTransaction::earning(amount, description, context_type, context_id);
        self.record(wallet, &tx);
        tokio::time::sleep(self.config.award_delay).await;

        match self.client.mint(wallet, amount, description).await {
            Ok(tx_hash) => {
                tx.confirm(tx_hash)?;
                self.apply(wallet, &tx, |balance| {
                    balance.credit(amount);
                    Ok(())
                })?;
                info!(wallet = %wallet, amount = %amount, context = %context_type, "tokens awarded");
                Ok(tx)
            }
            Err(e) => {
                self.fail(wallet, &mut tx, &e)?;
                Err(e)
            }
        }
    }

    fn wallet_lock(&self, wallet: &WalletAddress) -> Arc<tokio::sync::Mutex<()>> {
        self.wallet_locks
            .lock()
            .entry(wallet.clone())
            .or_default()
            .clone()
    }

    /// Prepend a pending transaction to the wallet's log.
    fn record(&self, wallet: &WalletAddress, tx: &TokenTransaction) {
        let mut state = self.state.lock();
        let log = state.logs.entry(wallet.clone()).or_default();
        log.insert(0, tx.clone());
        log.truncate(self.config.log_capacity);
        drop(state);
        self.snapshot();
    }

    fn apply(
        &self,
        wallet: &WalletAddress,
        tx: &TokenTransaction,
        delta: impl FnOnce(&mut TokenBalance) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        delta(state.balances.entry(wallet.clone()).or_default())?;
        Self::replace_entry(&mut state, wallet, tx);
        drop(state);
        self.snapshot();
        Ok(())
    }

    fn fail(&self, wallet: &WalletAddress, tx: &mut TokenTransaction, cause: &TokenError) -> Result<()> {
        tx.fail(cause.to_string())?;
        warn!(wallet = %wallet, transaction = %tx.id, error = %cause, "ledger call failed");
        Self::replace_entry(&mut self.state.lock(), wallet, tx);
        self.snapshot();
        Ok(())
    }

    fn replace_entry(state: &mut LedgerState, wallet: &WalletAddress, tx: &TokenTransaction) {
        if let Some(entry) = state
            .logs
            .get_mut(wallet)
            .and_then(|log| log.iter_mut().find(|entry| entry.id == tx.id))
        {
            *entry = tx.clone();
        }
    }

    /// Look up a logged transaction.
    pub fn find_transaction(
        &self,
        wallet: &WalletAddress,
        id: &TransactionId,
    ) -> Option<TokenTransaction> {
        self.state
            .lock()
            .logs
            .get(wallet)
            .and_then(|log| log.iter().find(|tx| &tx.id == id).cloned())
    }

    fn snapshot(&self) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        let state = self.state.lock();
        if let Err(e) = snapshots.balances.save(&state.balances) {
            warn!(error = %e, "failed to snapshot token balances");
        }
        if let Err(e) = snapshots.transactions.save(&state.logs) {
            warn!(error = %e, "failed to snapshot transaction logs");
        }
    }
}
