//! Corrective writes for each operation type.
//!
//! Every handler recomputes its target from authoritative inputs and skips
//! records that already hold the target values, so applying an operation
//! twice leaves the store exactly as applying it once.

use crate::error::Result;
use crate::operation::SyncOperation;
use chrono::Utc;
use serde_json::json;
use tracing::debug;
use trust_store::collections::{REVIEWS, USERS};
use trust_store::{DocumentStore, Fields, Filter, Record, fields};
use trust_token::LedgerClient;

/// Apply one operation. Returns the number of records written.
pub async fn apply<S: DocumentStore, L: LedgerClient>(
    store: &S,
    ledger: &L,
    operation: &SyncOperation,
) -> Result<usize> {
    match operation {
        SyncOperation::ReviewBlockchainConfirmed {
            blockchain_id,
            tx_hash,
            content_hash,
            confirmed_at,
        } => {
            let filter = Filter::eq("tx_hash", tx_hash.as_str())
                .or(Filter::eq("blockchain_id", blockchain_id.as_str()));
            let patch = fields(json!({
                "chain_verified": true,
                "tx_hash": tx_hash,
                "content_hash": content_hash,
                "blockchain_confirmed_at": confirmed_at,
            }))?;
            patch_matching(store, REVIEWS, &filter, &patch).await
        }
        SyncOperation::ReviewVerified {
            blockchain_id,
            verifier,
            verified_at,
        } => {
            let filter = Filter::eq("blockchain_id", blockchain_id.as_str());
            let patch = fields(json!({
                "verified_by": verifier,
                "verified_at": verified_at,
            }))?;
            patch_matching(store, REVIEWS, &filter, &patch).await
        }
        SyncOperation::UpdateUserBalance { wallet } => {
            let balance = ledger.balance_of(wallet).await?;
            let filter = Filter::eq("wallet_address", wallet.as_str());
            let patch = fields(json!({
                "trh_balance": balance.tokens(),
                "balance_updated_at": Utc::now(),
            }))?;
            let mut written = 0;
            for user in store.list(USERS, Some(&filter)).await? {
                store.update(USERS, &user.id, patch.clone()).await?;
                written += 1;
            }
            debug!(wallet = %wallet, balance = balance.tokens(), users = written, "cached balance overwritten");
            Ok(written)
        }
    }
}

async fn patch_matching<S: DocumentStore>(
    store: &S,
    collection: &str,
    filter: &Filter,
    patch: &Fields,
) -> Result<usize> {
    let mut written = 0;
    for record in store.list(collection, Some(filter)).await? {
        if already_applied(&record, patch) {
            debug!(collection, id = %record.id, "already reconciled");
            continue;
        }
        store.update(collection, &record.id, patch.clone()).await?;
        written += 1;
    }
    Ok(written)
}

fn already_applied(record: &Record, patch: &Fields) -> bool {
    patch
        .iter()
        .all(|(field, value)| record.get(field).as_ref() == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::Value;
    use trust_store::MemoryStore;
    use trust_token::{Amount, SimulatedLedger, WalletAddress};

    fn f(value: Value) -> Fields {
        fields(value).expect("object")
    }

    fn addr(s: &str) -> WalletAddress {
        WalletAddress::parse(s).expect("addr")
    }

    async fn review(store: &MemoryStore, chain_ref: &str) -> String {
        store
            .create(
                REVIEWS,
                f(json!({
                    "business_id": "b1",
                    "reviewer_address": "alice",
                    "rating": 5,
                    "content": "great",
                    "status": "published",
                    "blockchain_id": chain_ref,
                })),
            )
            .await
            .expect("create review")
            .id
    }

    fn confirmation(chain_ref: &str) -> SyncOperation {
        SyncOperation::ReviewBlockchainConfirmed {
            blockchain_id: chain_ref.to_string(),
            tx_hash: "0xabc".into(),
            content_hash: "deadbeef".into(),
            confirmed_at: Utc::now() - Duration::seconds(5),
        }
    }

    #[tokio::test]
    async fn test_confirmation_is_idempotent() {
        let store = MemoryStore::new();
        let ledger = SimulatedLedger::new();
        let id = review(&store, "chain_1").await;
        let op = confirmation("chain_1");

        assert_eq!(apply(&store, &ledger, &op).await.expect("apply"), 1);
        let first = store.get(REVIEWS, &id).await.expect("get");
        assert_eq!(first.get("chain_verified"), Some(json!(true)));
        assert_eq!(first.str_field("tx_hash"), Some("0xabc"));
        assert_eq!(first.str_field("content_hash"), Some("deadbeef"));

        assert_eq!(apply(&store, &ledger, &op).await.expect("apply"), 0);
        let second = store.get(REVIEWS, &id).await.expect("get");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_confirmation_matches_by_tx_hash() {
        let store = MemoryStore::new();
        let ledger = SimulatedLedger::new();
        let id = store
            .create(
                REVIEWS,
                f(json!({ "business_id": "b1", "reviewer_address": "a", "rating": 4, "content": "x", "tx_hash": "0xabc" })),
            )
            .await
            .expect("create")
            .id;

        assert_eq!(apply(&store, &ledger, &confirmation("other")).await.expect("apply"), 1);
        let record = store.get(REVIEWS, &id).await.expect("get");
        assert_eq!(record.get("chain_verified"), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_unknown_reference_writes_nothing() {
        let store = MemoryStore::new();
        let ledger = SimulatedLedger::new();
        review(&store, "chain_1").await;
        assert_eq!(apply(&store, &ledger, &confirmation("chain_9")).await.expect("apply"), 0);
    }

    #[tokio::test]
    async fn test_review_verified_stamps_verifier() {
        let store = MemoryStore::new();
        let ledger = SimulatedLedger::new();
        let id = review(&store, "chain_1").await;
        let op = SyncOperation::ReviewVerified {
            blockchain_id: "chain_1".into(),
            verifier: addr("moderator"),
            verified_at: Utc::now(),
        };

        assert_eq!(apply(&store, &ledger, &op).await.expect("apply"), 1);
        assert_eq!(apply(&store, &ledger, &op).await.expect("apply"), 0);
        let record = store.get(REVIEWS, &id).await.expect("get");
        assert_eq!(record.str_field("verified_by"), Some("moderator"));
        assert!(record.get("verified_at").is_some());
    }

    #[tokio::test]
    async fn test_balance_overwrite_from_ledger() {
        let store = MemoryStore::new();
        let ledger = SimulatedLedger::new();
        let id = store
            .create(USERS, f(json!({ "wallet_address": "alice", "trh_balance": 999 })))
            .await
            .expect("create")
            .id;
        ledger
            .mint(&addr("alice"), Amount::from_tokens(40), "reward")
            .await
            .expect("mint");

        let op = SyncOperation::UpdateUserBalance { wallet: addr("alice") };
        assert_eq!(apply(&store, &ledger, &op).await.expect("apply"), 1);
        let user = store.get(USERS, &id).await.expect("get");
        assert_eq!(user.get("trh_balance"), Some(json!(40)));
        assert!(user.get("balance_updated_at").is_some());
    }

    #[tokio::test]
    async fn test_balance_ledger_outage_is_error() {
        let store = MemoryStore::new();
        let ledger = SimulatedLedger::new();
        ledger.set_online(false);
        let op = SyncOperation::UpdateUserBalance { wallet: addr("alice") };
        let err = apply(&store, &ledger, &op).await.expect_err("offline");
        assert!(err.is_upstream());
    }
}
