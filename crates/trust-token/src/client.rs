//! Client seam to the external ledger.
//!
//! The ledger is authoritative for balances and emits events that the
//! reconciliation service consumes. [`SimulatedLedger`] is an in-process
//! backend used for development and tests.

use crate::amount::Amount;
use crate::error::{Result, TokenError};
use crate::wallet::WalletAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};
use trust_persist::JsonStore;
use uuid::Uuid;

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// An event emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A review was anchored on the ledger.
    ReviewSubmitted {
        /// Ledger-side review reference.
        review_id: String,
        /// Author of the review.
        reviewer: WalletAddress,
        /// Hash of the review content.
        content_hash: String,
        /// Ledger transaction hash.
        tx_hash: String,
    },
    /// A verifier attested a review.
    ReviewVerified {
        /// Ledger-side review reference.
        review_id: String,
        /// Verifier wallet.
        verifier: WalletAddress,
        /// Attestation time.
        verified_at: DateTime<Utc>,
    },
    /// Tokens moved between wallets. Burns transfer to the burn address.
    TokenTransfer {
        /// Sender.
        from: WalletAddress,
        /// Recipient.
        to: WalletAddress,
        /// Amount moved.
        amount: Amount,
        /// Ledger transaction hash.
        tx_hash: String,
    },
    /// New tokens were minted to a wallet.
    TokenMint {
        /// Recipient.
        to: WalletAddress,
        /// Amount minted.
        amount: Amount,
        /// Mint reason.
        reason: String,
        /// Ledger transaction hash.
        tx_hash: String,
    },
}

/// A review to anchor on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    /// Reference stored on the review record as `blockchain_id`.
    pub review_id: String,
    /// Author of the review.
    pub reviewer: WalletAddress,
    /// Business the review is about.
    pub business_id: String,
    /// Hex SHA-256 of the review content.
    pub content_hash: String,
}

/// Operations the token subsystem needs from the external ledger.
pub trait LedgerClient: Send + Sync + 'static {
    /// Authoritative balance of a wallet.
    fn balance_of(&self, address: &WalletAddress)
    -> impl Future<Output = Result<Amount>> + Send;

    /// Mint tokens to a wallet, returning the ledger transaction hash.
    fn mint(
        &self,
        to: &WalletAddress,
        amount: Amount,
        reason: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Burn tokens from a wallet, returning the ledger transaction hash.
    fn burn(
        &self,
        from: &WalletAddress,
        amount: Amount,
        reason: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Anchor a review, returning the ledger transaction hash.
    fn submit_review(
        &self,
        submission: &ReviewSubmission,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Attest a review on behalf of a verifier.
    fn verify_review(
        &self,
        review_id: &str,
        verifier: &WalletAddress,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Subscribe to ledger events.
    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent>;
}

/// Simulated ledger state.
#[derive(Debug, Default)]
struct SimulatedState {
    balances: HashMap<WalletAddress, Amount>,
    reviews: HashMap<String, ReviewSubmission>,
}

/// On-disk snapshots of the simulated chain.
struct ChainSnapshots {
    balances: JsonStore,
    reviews: JsonStore,
}

/// In-process ledger backend.
pub struct SimulatedLedger {
    state: Arc<Mutex<SimulatedState>>,
    events: broadcast::Sender<LedgerEvent>,
    online: AtomicBool,
    snapshots: Option<ChainSnapshots>,
}

impl SimulatedLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SimulatedState::default())),
            events,
            online: AtomicBool::new(true),
            snapshots: None,
        }
    }

    /// Open a ledger whose balances and anchored reviews are kept under
    /// `dir`, so they outlive the process like the token and document
    /// snapshots stored beside them.
    #[must_use]
    pub fn open(dir: &Path) -> Self {
        let snapshots = ChainSnapshots {
            balances: JsonStore::new(dir, "ledger_balances"),
            reviews: JsonStore::new(dir, "ledger_reviews"),
        };
        let state = SimulatedState {
            balances: snapshots.balances.load(),
            reviews: snapshots.reviews.load(),
        };
        debug!(
            wallets = state.balances.len(),
            reviews = state.reviews.len(),
            "loaded simulated ledger from disk"
        );

        Self {
            state: Arc::new(Mutex::new(state)),
            snapshots: Some(snapshots),
            ..Self::new()
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TokenError::ledger("ledger unreachable"))
        }
    }

    fn tx_hash() -> String {
        format!("0x{}", Uuid::new_v4().simple())
    }

    /// Write the chain state to disk. Called with the state lock held so
    /// snapshots are written in mutation order.
    fn snapshot(&self, state: &SimulatedState) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        if let Err(e) = snapshots.balances.save(&state.balances) {
            warn!(error = %e, "failed to snapshot ledger balances");
        }
        if let Err(e) = snapshots.reviews.save(&state.reviews) {
            warn!(error = %e, "failed to snapshot anchored reviews");
        }
    }

    fn emit(&self, event: LedgerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerClient for SimulatedLedger {
    async fn balance_of(&self, address: &WalletAddress) -> Result<Amount> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(state.balances.get(address).copied().unwrap_or(Amount::ZERO))
    }

    async fn mint(&self, to: &WalletAddress, amount: Amount, reason: &str) -> Result<String> {
        self.ensure_online()?;
        let tx_hash = Self::tx_hash();
        {
            let mut state = self.state.lock().await;
            let balance = state.balances.entry(to.clone()).or_default();
            *balance = balance.saturating_add(amount);
            self.snapshot(&state);
        }

        info!(to = %to, amount = %amount, reason, "tokens minted");
        self.emit(LedgerEvent::TokenMint {
            to: to.clone(),
            amount,
            reason: reason.to_string(),
            tx_hash: tx_hash.clone(),
        });
        Ok(tx_hash)
    }

    async fn burn(&self, from: &WalletAddress, amount: Amount, reason: &str) -> Result<String> {
        self.ensure_online()?;
        let tx_hash = Self::tx_hash();
        {
            let mut state = self.state.lock().await;
            let balance = state.balances.entry(from.clone()).or_default();
            *balance = balance.checked_sub(amount).ok_or_else(|| {
                TokenError::insufficient_balance(amount.tokens(), balance.tokens())
            })?;
            self.snapshot(&state);
        }

        info!(from = %from, amount = %amount, reason, "tokens burned");
        self.emit(LedgerEvent::TokenTransfer {
            from: from.clone(),
            to: WalletAddress::burn(),
            amount,
            tx_hash: tx_hash.clone(),
        });
        Ok(tx_hash)
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<String> {
        self.ensure_online()?;
        let tx_hash = Self::tx_hash();
        {
            let mut state = self.state.lock().await;
            state
                .reviews
                .insert(submission.review_id.clone(), submission.clone());
            self.snapshot(&state);
        }

        debug!(
            review_id = %submission.review_id,
            reviewer = %submission.reviewer,
            "review anchored"
        );
        self.emit(LedgerEvent::ReviewSubmitted {
            review_id: submission.review_id.clone(),
            reviewer: submission.reviewer.clone(),
            content_hash: submission.content_hash.clone(),
            tx_hash: tx_hash.clone(),
        });
        Ok(tx_hash)
    }

    async fn verify_review(&self, review_id: &str, verifier: &WalletAddress) -> Result<String> {
        self.ensure_online()?;
        if !self.state.lock().await.reviews.contains_key(review_id) {
            return Err(TokenError::ledger(format!("unknown review {review_id}")));
        }

        debug!(review_id, verifier = %verifier, "review attested");
        self.emit(LedgerEvent::ReviewVerified {
            review_id: review_id.to_string(),
            verifier: verifier.clone(),
            verified_at: Utc::now(),
        });
        Ok(Self::tx_hash())
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }
}
