//! Review submission, voting, moderation and attestation.
//!
//! [`ReviewService::submit`] is the user-facing entry point of the reward
//! pipeline: it writes the review, scores it, pays the reward through the
//! [`TokenLedger`] and anchors the review on the ledger. Derived fields that
//! depend on the ledger (confirmation flags, cached balances) are left to the
//! reconciliation service.

use crate::error::{CoreError, Result};
use crate::identity::IdentityCache;
use crate::model::{BusinessRecord, ReviewRecord, ReviewStatus, UserRecord, decode};
use crate::reward::RewardSchedule;
use crate::scoring::{QualityScore, ReviewSignals, score};
use crate::stats::StatsAggregator;
use crate::validation::{validate_content, validate_rating, validate_title};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use trust_store::collections::{BUSINESSES, REVIEW_VOTES, REVIEWS, USERS};
use trust_store::{DocumentStore, Filter, fields};
use trust_token::{
    Amount, ContextType, LedgerClient, ReviewSubmission, TokenLedger, TokenTransaction,
    WalletAddress,
};
use uuid::Uuid;

/// A review as submitted by its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    /// Reviewed business.
    pub business_id: String,
    /// Author wallet.
    pub reviewer: WalletAddress,
    /// Star rating, 1 to 5.
    pub rating: u8,
    /// Optional headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Body text.
    pub content: String,
    /// Photos or video attached.
    #[serde(default)]
    pub has_media: bool,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedReview {
    /// The stored review.
    pub review: ReviewRecord,
    /// Quality breakdown.
    pub score: QualityScore,
    /// Tokens due for the review.
    pub reward: u64,
    /// The review was the first published one for its business.
    pub early_reviewer: bool,
    /// The reward transaction; `None` if the ledger rejected the award.
    pub transaction: Option<TokenTransaction>,
}

/// Hex SHA-256 of review content, as anchored on the ledger.
#[must_use]
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Review workflows over a document store and token ledger.
pub struct ReviewService<S, L> {
    store: Arc<S>,
    ledger: Arc<TokenLedger<L>>,
    identity: Arc<IdentityCache>,
    stats: StatsAggregator<S>,
    schedule: RewardSchedule,
    /// Serializes votes per review; shared between clones.
    vote_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<S, L> Clone for ReviewService<S, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: Arc::clone(&self.ledger),
            identity: Arc::clone(&self.identity),
            stats: self.stats.clone(),
            schedule: self.schedule.clone(),
            vote_locks: Arc::clone(&self.vote_locks),
        }
    }
}

impl<S: DocumentStore, L: LedgerClient> ReviewService<S, L> {
    /// Create a service with the default reward schedule.
    pub fn new(store: Arc<S>, ledger: Arc<TokenLedger<L>>, identity: Arc<IdentityCache>) -> Self {
        Self {
            stats: StatsAggregator::new(Arc::clone(&store)),
            store,
            ledger,
            identity,
            schedule: RewardSchedule::default(),
            vote_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Use a custom reward schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: RewardSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// The reward schedule in use.
    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    /// Submit a review and pay its reward.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a bad rating or empty content,
    /// [`CoreError::NotFound`] for an unknown business, and store errors from
    /// the review write. Failures after the review is stored (reward, ledger
    /// anchoring, rollups) are logged and do not fail the submission.
    pub async fn submit(&self, new: NewReview) -> Result<SubmittedReview> {
        let rating = validate_rating(new.rating)?;
        let content = validate_content(&new.content)?;
        let title = validate_title(new.title.as_deref())?;
        let business = self.business(&new.business_id).await?;
        let reviewer = new.reviewer;

        let published = Filter::eq("business_id", business.id.as_str())
            .and(Filter::eq("status", ReviewStatus::Published.as_str()));
        let is_first_review = self.store.count(REVIEWS, Some(&published)).await? == 0;

        let author = self.author(&reviewer).await?;
        let now = Utc::now();
        let identity_verified = self.identity.is_verified(&reviewer)
            || author.as_ref().is_some_and(|u| u.world_id_verified);
        let signals = ReviewSignals {
            text_length: content.chars().count(),
            helpful_votes: author.as_ref().map_or(0, |u| u.helpful_votes),
            has_media: new.has_media,
            account_age_days: author.as_ref().map_or(0.0, |u| u.account_age_days(now)),
            identity_verified,
            is_first_review,
        };
        let quality = score(&signals);

        let hash = content_hash(&content);
        let chain_ref = format!("chain_{}", Uuid::new_v4().simple());
        let record = self
            .store
            .create(
                REVIEWS,
                fields(json!({
                    "business_id": business.id,
                    "reviewer_address": reviewer,
                    "rating": rating,
                    "title": title,
                    "content": content,
                    "world_id_verified": identity_verified,
                    "chain_verified": false,
                    "helpful_votes": 0,
                    "not_helpful_votes": 0,
                    "status": ReviewStatus::Published,
                    "has_media": new.has_media,
                    "quality_score": quality.overall_score,
                    "blockchain_id": chain_ref,
                }))?,
            )
            .await?;
        let review: ReviewRecord = decode(&record)?;
        info!(
            review_id = %review.id,
            business_id = %business.id,
            reviewer = %reviewer,
            rating,
            "review submitted"
        );

        // Re-read so a concurrent first review for the business is seen.
        let early_reviewer = self.store.count(REVIEWS, Some(&published)).await? == 1;
        let reward = self.schedule.reward(&quality, early_reviewer);
        let transaction = self.pay_reward(&reviewer, &review.id, reward).await;

        let submission = ReviewSubmission {
            review_id: chain_ref,
            reviewer: reviewer.clone(),
            business_id: business.id.clone(),
            content_hash: hash,
        };
        if let Err(e) = self.ledger.client().submit_review(&submission).await {
            warn!(review_id = %review.id, error = %e, "failed to anchor review on ledger");
        }

        self.refresh_rollups(&business.id, &reviewer).await;

        Ok(SubmittedReview {
            review,
            score: quality,
            reward,
            early_reviewer,
            transaction,
        })
    }

    /// Record a helpful or unhelpful vote.
    ///
    /// Votes on the same review are applied one at a time and the counters
    /// are recounted from the vote rows, so concurrent voters are never lost.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown review and
    /// [`CoreError::Validation`] for a self-vote or a repeated vote.
    pub async fn cast_vote(
        &self,
        review_id: &str,
        voter: &WalletAddress,
        helpful: bool,
    ) -> Result<ReviewRecord> {
        let lock = self.vote_lock(review_id);
        let _guard = lock.lock().await;

        let review = self.review(review_id).await?;
        if &review.reviewer_address == voter {
            return Err(CoreError::validation("voter", "cannot vote on your own review"));
        }
        let already = Filter::eq("review_id", review_id).and(Filter::eq("voter", voter.as_str()));
        if self.store.first(REVIEW_VOTES, &already).await?.is_some() {
            return Err(CoreError::validation("voter", "already voted on this review"));
        }

        self.store
            .create(
                REVIEW_VOTES,
                fields(json!({ "review_id": review_id, "voter": voter, "helpful": helpful }))?,
            )
            .await?;
        let helpful_votes = self.count_votes(review_id, true).await?;
        let not_helpful_votes = self.count_votes(review_id, false).await?;
        let patch = json!({
            "helpful_votes": helpful_votes,
            "not_helpful_votes": not_helpful_votes,
        });
        let updated: ReviewRecord = decode(&self.store.update(REVIEWS, review_id, fields(patch)?).await?)?;
        debug!(review_id, voter = %voter, helpful, helpful_votes, not_helpful_votes, "vote recorded");

        if let Err(e) = self.stats.recompute_user(&updated.reviewer_address).await {
            warn!(wallet = %updated.reviewer_address, error = %e, "user rollup failed after vote");
        }
        Ok(updated)
    }

    async fn count_votes(&self, review_id: &str, helpful: bool) -> Result<usize> {
        let filter = Filter::eq("review_id", review_id).and(Filter::eq("helpful", helpful));
        Ok(self.store.count(REVIEW_VOTES, Some(&filter)).await?)
    }

    fn vote_lock(&self, review_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.vote_locks
            .lock()
            .entry(review_id.to_string())
            .or_default()
            .clone()
    }

    /// Move a review to a new moderation status.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown review.
    pub async fn set_status(&self, review_id: &str, status: ReviewStatus) -> Result<ReviewRecord> {
        let review = self.review(review_id).await?;
        if review.status == status {
            return Ok(review);
        }
        let record = self
            .store
            .update(REVIEWS, review_id, fields(json!({ "status": status }))?)
            .await?;
        info!(review_id, from = %review.status, to = %status, "review status changed");

        self.refresh_rollups(&review.business_id, &review.reviewer_address).await;
        decode(&record)
    }

    /// Ask the ledger to attest a review on behalf of `verifier`.
    ///
    /// Returns the ledger transaction hash. The review's `verified_by` and
    /// `verified_at` fields are filled in once the ledger event is reconciled.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown review,
    /// [`CoreError::Validation`] if it was never anchored, or the ledger error.
    pub async fn attest(&self, review_id: &str, verifier: &WalletAddress) -> Result<String> {
        let review = self.review(review_id).await?;
        let Some(chain_ref) = review.blockchain_id else {
            return Err(CoreError::validation("review_id", "review has no ledger reference"));
        };
        let tx_hash = self.ledger.client().verify_review(&chain_ref, verifier).await?;
        info!(review_id, verifier = %verifier, tx_hash = %tx_hash, "review attestation submitted");
        Ok(tx_hash)
    }

    async fn pay_reward(
        &self,
        reviewer: &WalletAddress,
        review_id: &str,
        reward: u64,
    ) -> Option<TokenTransaction> {
        if reward == 0 {
            return None;
        }
        match self
            .ledger
            .award(
                reviewer,
                Amount::from_tokens(reward),
                "Review reward",
                ContextType::ReviewReward,
                Some(review_id.to_string()),
            )
            .await
        {
            Ok(tx) => Some(tx),
            Err(e) => {
                error!(review_id, reviewer = %reviewer, reward, error = %e, "review reward failed");
                None
            }
        }
    }

    async fn refresh_rollups(&self, business_id: &str, reviewer: &WalletAddress) {
        if let Err(e) = self.stats.recompute_business(business_id).await {
            warn!(business_id, error = %e, "business rollup failed");
        }
        if let Err(e) = self.stats.recompute_user(reviewer).await {
            warn!(wallet = %reviewer, error = %e, "user rollup failed");
        }
    }

    async fn business(&self, id: &str) -> Result<BusinessRecord> {
        if id.trim().is_empty() {
            return Err(CoreError::validation("business_id", "must not be empty"));
        }
        let record = self
            .store
            .get(BUSINESSES, id)
            .await
            .map_err(|e| CoreError::from_lookup("business", id, e))?;
        decode(&record)
    }

    async fn review(&self, id: &str) -> Result<ReviewRecord> {
        let record = self
            .store
            .get(REVIEWS, id)
            .await
            .map_err(|e| CoreError::from_lookup("review", id, e))?;
        decode(&record)
    }

    async fn author(&self, wallet: &WalletAddress) -> Result<Option<UserRecord>> {
        match self
            .store
            .first(USERS, &Filter::eq("wallet_address", wallet.as_str()))
            .await?
        {
            Some(record) => Ok(Some(decode(&record)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{VerificationLevel, VerificationRecord};
    use chrono::Duration;
    use serde_json::Value;
    use trust_store::{Fields, MemoryStore};
    use trust_token::{LedgerConfig, LedgerEvent, SimulatedLedger, TransactionStatus};

    struct Harness {
        store: Arc<MemoryStore>,
        chain: Arc<SimulatedLedger>,
        ledger: Arc<TokenLedger<SimulatedLedger>>,
        identity: Arc<IdentityCache>,
        service: ReviewService<MemoryStore, SimulatedLedger>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(SimulatedLedger::new());
        let ledger = Arc::new(TokenLedger::new(Arc::clone(&chain), LedgerConfig::instant()));
        let identity = Arc::new(IdentityCache::new());
        let service = ReviewService::new(Arc::clone(&store), Arc::clone(&ledger), Arc::clone(&identity));
        Harness {
            store,
            chain,
            ledger,
            identity,
            service,
        }
    }

    fn f(value: Value) -> Fields {
        fields(value).expect("object")
    }

    fn addr(s: &str) -> WalletAddress {
        WalletAddress::parse(s).expect("valid address")
    }

    async fn business(h: &Harness) -> String {
        h.store
            .create(BUSINESSES, f(json!({ "name": "The Daily Grind", "slug": "the-daily-grind" })))
            .await
            .expect("create business")
            .id
    }

    fn new_review(business_id: &str, reviewer: &str, content: &str) -> NewReview {
        NewReview {
            business_id: business_id.to_string(),
            reviewer: addr(reviewer),
            rating: 5,
            title: Some("Great".into()),
            content: content.to_string(),
            has_media: false,
        }
    }

    fn verify(h: &Harness, wallet: &str) {
        h.identity
            .record(
                &addr(wallet),
                VerificationRecord {
                    nullifier_hash: format!("0xnull-{wallet}"),
                    merkle_root: "0xroot".into(),
                    proof: "0xproof".into(),
                    verification_level: VerificationLevel::Orb,
                    verified_at: Utc::now(),
                },
            )
            .expect("record verification");
    }

    #[tokio::test]
    async fn first_review_gets_early_bonus() {
        let h = harness();
        let id = business(&h).await;

        let submitted = h
            .service
            .submit(new_review(&id, "alice", "short"))
            .await
            .expect("submit");
        assert!(submitted.early_reviewer);
        // 5 chars of text, first review: multiplier (1 + 0.0075*2)*2 = 2.03
        assert_eq!(submitted.reward, 20 + 20);
        let tx = submitted.transaction.expect("reward paid");
        assert_eq!(tx.status, TransactionStatus::Confirmed);
        assert_eq!(h.ledger.balance(&addr("alice")).available, Amount::from_tokens(40));
        assert!(submitted.review.blockchain_id.is_some());
        assert_eq!(submitted.review.status, ReviewStatus::Published);
    }

    #[tokio::test]
    async fn verified_established_reviewer_earns_27() {
        let h = harness();
        let id = business(&h).await;
        h.service
            .submit(new_review(&id, "bob", "first"))
            .await
            .expect("seed review");

        h.store
            .create(
                USERS,
                f(json!({ "wallet_address": "carol", "joined_at": Utc::now() - Duration::days(30) })),
            )
            .await
            .expect("create user");
        verify(&h, "carol");

        let submitted = h
            .service
            .submit(new_review(&id, "carol", &"x".repeat(250)))
            .await
            .expect("submit");
        assert!((submitted.score.overall_score - 60.0).abs() < 1e-9);
        assert!((submitted.score.multiplier - 2.2).abs() < 1e-9);
        assert!(!submitted.early_reviewer);
        assert_eq!(submitted.reward, 27);
        assert!(submitted.review.world_id_verified);
        assert_eq!(h.ledger.balance(&addr("carol")).earned, Amount::from_tokens(27));
    }

    #[tokio::test]
    async fn submission_updates_rollups() {
        let h = harness();
        let id = business(&h).await;
        h.store
            .create(USERS, f(json!({ "wallet_address": "alice" })))
            .await
            .expect("create user");
        h.service
            .submit(new_review(&id, "alice", "lovely"))
            .await
            .expect("submit");

        let record = h.store.get(BUSINESSES, &id).await.expect("business");
        let business: BusinessRecord = decode(&record).expect("decode");
        assert_eq!(business.total_reviews, 1);
        assert_eq!(business.rating_5, 1);

        let user = h.store.first(USERS, &Filter::eq("wallet_address", "alice")).await.expect("first").expect("user");
        let user: UserRecord = decode(&user).expect("decode");
        assert_eq!(user.reviews_count, 1);
        assert_eq!(user.reputation_score, 100);
    }

    #[tokio::test]
    async fn submission_anchors_review_on_ledger() {
        let h = harness();
        let id = business(&h).await;
        let mut events = h.chain.subscribe();

        let submitted = h
            .service
            .submit(new_review(&id, "alice", "anchored"))
            .await
            .expect("submit");

        loop {
            match events.recv().await.expect("event") {
                LedgerEvent::ReviewSubmitted { review_id, content_hash: hash, .. } => {
                    assert_eq!(Some(review_id), submitted.review.blockchain_id);
                    assert_eq!(hash, content_hash("anchored"));
                    break;
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn invalid_submissions_are_rejected() {
        let h = harness();
        let id = business(&h).await;

        let mut bad_rating = new_review(&id, "alice", "text");
        bad_rating.rating = 6;
        assert!(matches!(
            h.service.submit(bad_rating).await,
            Err(CoreError::Validation { .. })
        ));
        assert!(matches!(
            h.service.submit(new_review(&id, "alice", "   ")).await,
            Err(CoreError::Validation { .. })
        ));
        assert!(matches!(
            h.service.submit(new_review("missing", "alice", "text")).await,
            Err(CoreError::NotFound { kind: "business", .. })
        ));
        assert_eq!(h.store.count(REVIEWS, None).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn ledger_outage_keeps_review_without_reward() {
        let h = harness();
        let id = business(&h).await;
        h.chain.set_online(false);

        let submitted = h
            .service
            .submit(new_review(&id, "alice", "offline"))
            .await
            .expect("submit");
        assert!(submitted.transaction.is_none());
        assert!(h.ledger.balance(&addr("alice")).available.is_zero());
        let log = h.ledger.transactions(&addr("alice"), 10);
        assert_eq!(log[0].status, TransactionStatus::Failed);
        assert_eq!(h.store.count(REVIEWS, None).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn votes_are_counted_once_per_voter() {
        let h = harness();
        let id = business(&h).await;
        let review = h
            .service
            .submit(new_review(&id, "alice", "vote on me"))
            .await
            .expect("submit")
            .review;

        let updated = h
            .service
            .cast_vote(&review.id, &addr("bob"), true)
            .await
            .expect("vote");
        assert_eq!(updated.helpful_votes, 1);

        let updated = h
            .service
            .cast_vote(&review.id, &addr("carol"), false)
            .await
            .expect("vote");
        assert_eq!(updated.not_helpful_votes, 1);

        assert!(h.service.cast_vote(&review.id, &addr("bob"), true).await.is_err());
        assert!(h.service.cast_vote(&review.id, &addr("alice"), true).await.is_err());
        assert!(matches!(
            h.service.cast_vote("missing", &addr("bob"), true).await,
            Err(CoreError::NotFound { kind: "review", .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_are_all_counted() {
        let h = harness();
        let id = business(&h).await;
        let review = h
            .service
            .submit(new_review(&id, "alice", "vote on me"))
            .await
            .expect("submit")
            .review;

        let mut tasks = Vec::new();
        for i in 0..100 {
            let service = h.service.clone();
            let review_id = review.id.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .cast_vote(&review_id, &addr(&format!("voter{i}")), i % 4 != 0)
                    .await
            }));
        }
        for task in tasks {
            task.await.expect("join").expect("vote");
        }

        let stored: ReviewRecord =
            decode(&h.store.get(REVIEWS, &review.id).await.expect("get")).expect("decode");
        assert_eq!(stored.helpful_votes, 75);
        assert_eq!(stored.not_helpful_votes, 25);
        assert_eq!(h.store.count(REVIEW_VOTES, None).await.expect("count"), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_repeat_votes_count_once() {
        let h = harness();
        let id = business(&h).await;
        let review = h
            .service
            .submit(new_review(&id, "alice", "vote on me"))
            .await
            .expect("submit")
            .review;

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let service = h.service.clone();
            let review_id = review.id.clone();
            tasks.push(tokio::spawn(async move {
                service.cast_vote(&review_id, &addr("bob"), true).await
            }));
        }
        let mut accepted = 0;
        for task in tasks {
            if task.await.expect("join").is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(h.store.count(REVIEW_VOTES, None).await.expect("count"), 1);
        let stored: ReviewRecord =
            decode(&h.store.get(REVIEWS, &review.id).await.expect("get")).expect("decode");
        assert_eq!(stored.helpful_votes, 1);
    }

    #[tokio::test]
    async fn rejecting_the_only_review_keeps_rollup() {
        let h = harness();
        let id = business(&h).await;
        let review = h
            .service
            .submit(new_review(&id, "alice", "soon gone"))
            .await
            .expect("submit")
            .review;

        let updated = h
            .service
            .set_status(&review.id, ReviewStatus::Rejected)
            .await
            .expect("status");
        assert_eq!(updated.status, ReviewStatus::Rejected);

        let business: BusinessRecord =
            decode(&h.store.get(BUSINESSES, &id).await.expect("get")).expect("decode");
        assert_eq!(business.total_reviews, 1);
    }

    #[tokio::test]
    async fn attest_forwards_to_ledger() {
        let h = harness();
        let id = business(&h).await;
        let review = h
            .service
            .submit(new_review(&id, "alice", "attest me"))
            .await
            .expect("submit")
            .review;
        let mut events = h.chain.subscribe();

        let tx_hash = h
            .service
            .attest(&review.id, &addr("moderator"))
            .await
            .expect("attest");
        assert!(tx_hash.starts_with("0x"));
        match events.recv().await.expect("event") {
            LedgerEvent::ReviewVerified { review_id, verifier, .. } => {
                assert_eq!(Some(review_id), review.blockchain_id);
                assert_eq!(verifier, addr("moderator"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
