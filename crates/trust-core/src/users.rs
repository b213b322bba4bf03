//! User lookups and sign-in upserts.

use crate::error::{CoreError, Result};
use crate::identity::VerificationRecord;
use crate::model::{UserRecord, decode};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use trust_store::collections::USERS;
use trust_store::{DocumentStore, Filter, fields};
use trust_token::WalletAddress;

/// Result of [`UserDirectory::upsert_on_login`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    /// The user after the upsert.
    pub user: UserRecord,
    /// The user did not exist before.
    pub created: bool,
    /// The user became identity-verified in this sign-in.
    pub newly_verified: bool,
}

/// Users keyed by wallet address.
pub struct UserDirectory<S> {
    store: Arc<S>,
}

impl<S> Clone for UserDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> UserDirectory<S> {
    /// Create a directory over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The user owning `wallet`, if any.
    pub async fn find_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<UserRecord>> {
        let filter = Filter::eq("wallet_address", wallet.as_str());
        match self.store.first(USERS, &filter).await? {
            Some(record) => Ok(Some(decode(&record)?)),
            None => Ok(None),
        }
    }

    /// The user owning `wallet`, or [`CoreError::NotFound`].
    pub async fn require(&self, wallet: &WalletAddress) -> Result<UserRecord> {
        self.find_by_wallet(wallet)
            .await?
            .ok_or_else(|| CoreError::not_found("user", wallet.as_str()))
    }

    /// Create or refresh the user behind a signed-in wallet.
    ///
    /// An identity verification, when given, is copied onto the user unless
    /// the user is already verified.
    pub async fn upsert_on_login(
        &self,
        wallet: &WalletAddress,
        verification: Option<&VerificationRecord>,
    ) -> Result<LoginOutcome> {
        let now = Utc::now();
        let mut patch = fields(json!({ "last_active": now }))?;
        let existing = self.find_by_wallet(wallet).await?;
        let already_verified = existing.as_ref().is_some_and(|u| u.world_id_verified);

        let newly_verified = match verification {
            Some(v) if !already_verified => {
                patch.extend(fields(json!({
                    "world_id_verified": true,
                    "world_id_hash": v.nullifier_hash,
                    "verification_level": v.verification_level,
                    "verified_at": v.verified_at,
                }))?);
                true
            }
            _ => false,
        };

        let (record, created) = match existing {
            Some(user) => (self.store.update(USERS, &user.id, patch).await?, false),
            None => {
                let mut new_user = fields(UserRecord::new(wallet.clone()))?;
                new_user.extend(patch);
                let record = self.store.create(USERS, new_user).await?;
                info!(wallet = %wallet, verified = newly_verified, "user created");
                (record, true)
            }
        };

        Ok(LoginOutcome {
            user: decode(&record)?,
            created,
            newly_verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::VerificationLevel;
    use crate::tiers::{Badge, Level};
    use trust_store::MemoryStore;

    fn verification() -> VerificationRecord {
        VerificationRecord {
            nullifier_hash: "0xnull".into(),
            merkle_root: "0xroot".into(),
            proof: "0xproof".into(),
            verification_level: VerificationLevel::Orb,
            verified_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn first_login_creates_user() {
        let dir = UserDirectory::new(Arc::new(MemoryStore::new()));
        let wallet = WalletAddress::parse("alice").expect("addr");

        let outcome = dir.upsert_on_login(&wallet, None).await.expect("upsert");
        assert!(outcome.created);
        assert!(!outcome.newly_verified);
        assert_eq!(outcome.user.level, Level::Beginner);
        assert_eq!(outcome.user.badge, Badge::Bronze);
        assert!(outcome.user.last_active.is_some());

        let again = dir.upsert_on_login(&wallet, None).await.expect("upsert");
        assert!(!again.created);
        assert_eq!(again.user.id, outcome.user.id);
    }

    #[tokio::test]
    async fn verification_is_applied_once() {
        let dir = UserDirectory::new(Arc::new(MemoryStore::new()));
        let wallet = WalletAddress::parse("alice").expect("addr");
        dir.upsert_on_login(&wallet, None).await.expect("upsert");

        let v = verification();
        let outcome = dir.upsert_on_login(&wallet, Some(&v)).await.expect("upsert");
        assert!(outcome.newly_verified);
        assert!(outcome.user.world_id_verified);
        assert_eq!(outcome.user.world_id_hash.as_deref(), Some("0xnull"));
        assert_eq!(outcome.user.verification_level.as_deref(), Some("orb"));

        let repeat = dir.upsert_on_login(&wallet, Some(&v)).await.expect("upsert");
        assert!(!repeat.newly_verified);
    }

    #[tokio::test]
    async fn require_unknown_wallet_is_not_found() {
        let dir = UserDirectory::new(Arc::new(MemoryStore::new()));
        let wallet = WalletAddress::parse("ghost").expect("addr");
        let err = dir.require(&wallet).await.expect_err("missing");
        assert!(matches!(err, CoreError::NotFound { kind: "user", .. }));
    }
}
