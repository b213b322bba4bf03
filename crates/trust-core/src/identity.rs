//! Cached identity verifications.
//!
//! A verification counts for 30 days from `verified_at`. Freshness is
//! decided at read time; expired entries read as unverified and are dropped.
//! A nullifier hash identifies one human, so it may back only one wallet.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};
use trust_persist::JsonStore;
use trust_token::WalletAddress;

/// Days a verification stays valid.
pub const VERIFICATION_TTL_DAYS: i64 = 30;

/// Strength of the identity proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    /// Biometric orb verification.
    #[default]
    Orb,
    /// Device-bound verification.
    Device,
}

impl fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orb => write!(f, "orb"),
            Self::Device => write!(f, "device"),
        }
    }
}

/// A verified identity proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Unique-human nullifier.
    pub nullifier_hash: String,
    /// Merkle root the proof was checked against.
    pub merkle_root: String,
    /// The proof itself.
    pub proof: String,
    /// Proof strength.
    pub verification_level: VerificationLevel,
    /// When the proof was verified.
    pub verified_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Whether the record is still fresh at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.verified_at < ttl
    }
}

/// Per-wallet verification cache.
pub struct IdentityCache {
    records: Mutex<HashMap<WalletAddress, VerificationRecord>>,
    store: Option<JsonStore>,
    ttl: Duration,
}

impl IdentityCache {
    /// Create an in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            store: None,
            ttl: Duration::days(VERIFICATION_TTL_DAYS),
        }
    }

    /// Create a cache persisted under `state_path`.
    pub fn open(state_path: &Path) -> Self {
        let store = JsonStore::new(state_path, "worldid_verification");
        let records: HashMap<WalletAddress, VerificationRecord> = store.load();
        debug!(count = records.len(), "loaded identity verifications from disk");
        Self {
            records: Mutex::new(records),
            store: Some(store),
            ..Self::new()
        }
    }

    /// Override the freshness window.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Store a verification for `wallet`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the nullifier already backs a
    /// different wallet with a fresh verification.
    pub fn record(&self, wallet: &WalletAddress, record: VerificationRecord) -> Result<()> {
        let now = Utc::now();
        let mut records = self.records.lock();
        let reused = records.iter().any(|(other, existing)| {
            other != wallet
                && existing.nullifier_hash == record.nullifier_hash
                && existing.is_fresh(now, self.ttl)
        });
        if reused {
            return Err(CoreError::validation(
                "nullifier_hash",
                "identity proof already linked to another wallet",
            ));
        }
        records.insert(wallet.clone(), record);
        drop(records);

        info!(wallet = %wallet, "identity verification recorded");
        self.snapshot();
        Ok(())
    }

    /// Fresh verification of `wallet`, if any.
    pub fn get(&self, wallet: &WalletAddress) -> Option<VerificationRecord> {
        self.get_at(wallet, Utc::now())
    }

    /// Fresh verification of `wallet` as of `now`.
    pub fn get_at(&self, wallet: &WalletAddress, now: DateTime<Utc>) -> Option<VerificationRecord> {
        let mut records = self.records.lock();
        let record = records.get(wallet)?.clone();
        if record.is_fresh(now, self.ttl) {
            return Some(record);
        }
        records.remove(wallet);
        drop(records);
        debug!(wallet = %wallet, "identity verification expired");
        self.snapshot();
        None
    }

    /// Whether `wallet` holds a fresh verification.
    pub fn is_verified(&self, wallet: &WalletAddress) -> bool {
        self.get(wallet).is_some()
    }

    /// Forget the verification of `wallet`.
    pub fn clear(&self, wallet: &WalletAddress) {
        if self.records.lock().remove(wallet).is_some() {
            self.snapshot();
        }
    }

    fn snapshot(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(&*self.records.lock()) {
            warn!(error = %e, "failed to snapshot identity verifications");
        }
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(s: &str) -> WalletAddress {
        WalletAddress::parse(s).expect("valid address")
    }

    fn proof(nullifier: &str, verified_at: DateTime<Utc>) -> VerificationRecord {
        VerificationRecord {
            nullifier_hash: nullifier.to_string(),
            merkle_root: "0xroot".to_string(),
            proof: "0xproof".to_string(),
            verification_level: VerificationLevel::Orb,
            verified_at,
        }
    }

    #[test]
    fn fresh_verification_is_reported() {
        let cache = IdentityCache::new();
        let alice = wallet("alice");
        cache.record(&alice, proof("n1", Utc::now())).expect("record");
        assert!(cache.is_verified(&alice));
        assert!(!cache.is_verified(&wallet("bob")));
    }

    #[test]
    fn verification_expires_after_thirty_days() {
        let cache = IdentityCache::new();
        let alice = wallet("alice");
        let verified_at = Utc::now();
        cache.record(&alice, proof("n1", verified_at)).expect("record");

        assert!(cache.get_at(&alice, verified_at + Duration::days(29)).is_some());
        assert!(cache.get_at(&alice, verified_at + Duration::days(30)).is_none());
        // Expired entries are dropped on read.
        assert!(cache.get_at(&alice, verified_at).is_none());
    }

    #[test]
    fn nullifier_cannot_back_two_wallets() {
        let cache = IdentityCache::new();
        cache.record(&wallet("alice"), proof("n1", Utc::now())).expect("record");
        let err = cache
            .record(&wallet("bob"), proof("n1", Utc::now()))
            .expect_err("reused nullifier");
        assert!(matches!(err, CoreError::Validation { .. }));

        // Re-verifying the same wallet is fine.
        cache.record(&wallet("alice"), proof("n1", Utc::now())).expect("re-verify");
    }

    #[test]
    fn expired_nullifier_can_move() {
        let cache = IdentityCache::new();
        let stale = Utc::now() - Duration::days(31);
        cache.record(&wallet("alice"), proof("n1", stale)).expect("record");
        cache.record(&wallet("bob"), proof("n1", Utc::now())).expect("stale binding released");
    }

    #[test]
    fn clear_forgets() {
        let cache = IdentityCache::new();
        let alice = wallet("alice");
        cache.record(&alice, proof("n1", Utc::now())).expect("record");
        cache.clear(&alice);
        assert!(!cache.is_verified(&alice));
    }

    #[test]
    fn persisted_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let alice = wallet("alice");
        IdentityCache::open(dir.path())
            .record(&alice, proof("n1", Utc::now()))
            .expect("record");
        assert!(IdentityCache::open(dir.path()).is_verified(&alice));
    }

    #[test]
    fn custom_ttl() {
        let cache = IdentityCache::new().with_ttl(Duration::hours(1));
        let alice = wallet("alice");
        let at = Utc::now();
        cache.record(&alice, proof("n1", at)).expect("record");
        assert!(cache.get_at(&alice, at + Duration::hours(2)).is_none());
    }
}
