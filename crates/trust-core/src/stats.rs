//! Business and user rollups.
//!
//! Rollups are always recomputed from the full set of published reviews and
//! overwritten, never patched incrementally. A business with no published
//! reviews keeps its previous rollup.

use crate::error::Result;
use crate::model::{ReviewRecord, ReviewStatus, UserRecord, decode};
use crate::tiers::Standing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};
use trust_store::collections::{BUSINESSES, REVIEWS, USERS};
use trust_store::{DocumentStore, Fields, Filter, fields};
use trust_token::WalletAddress;

/// Denormalized rating summary of a business.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusinessRollup {
    /// Mean rating, rounded to 2 decimals.
    pub average_rating: f64,
    /// Number of published reviews.
    pub total_reviews: u32,
    /// Review counts by star, index 0 is one star.
    pub histogram: [u32; 5],
}

impl BusinessRollup {
    /// Rollup of a set of ratings; `None` when there are none.
    ///
    /// Ratings outside `1..=5` are ignored so the histogram always sums to
    /// the total.
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Option<Self> {
        let mut histogram = [0u32; 5];
        let mut sum = 0u64;
        let mut total = 0u32;
        for rating in ratings {
            if !(1..=5).contains(&rating) {
                warn!(rating, "ignoring out-of-range rating");
                continue;
            }
            histogram[usize::from(rating - 1)] += 1;
            sum += u64::from(rating);
            total += 1;
        }
        if total == 0 {
            return None;
        }

        let average = sum as f64 / f64::from(total);
        Some(Self {
            average_rating: (average * 100.0).round() / 100.0,
            total_reviews: total,
            histogram,
        })
    }

    /// Store patch for the business record.
    pub fn to_fields(&self, at: DateTime<Utc>) -> Fields {
        let [r1, r2, r3, r4, r5] = self.histogram;
        let patch = json!({
            "average_rating": self.average_rating,
            "total_reviews": self.total_reviews,
            "rating_1": r1,
            "rating_2": r2,
            "rating_3": r3,
            "rating_4": r4,
            "rating_5": r5,
            "stats_updated_at": at,
        });
        fields(patch).unwrap_or_default()
    }
}

/// Denormalized activity summary of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRollup {
    /// Published reviews written.
    pub reviews_count: u32,
    /// Helpful votes across those reviews.
    pub helpful_votes: u32,
    /// Those written while identity-verified.
    pub verified_reviews: u32,
    /// Reputation, level and badge from the three counters.
    pub standing: Standing,
}

impl UserRollup {
    /// Rollup of a user's published reviews.
    #[must_use]
    pub fn from_reviews(reviews: &[ReviewRecord]) -> Self {
        let published = reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Published);
        let (mut count, mut helpful, mut verified) = (0u32, 0u32, 0u32);
        for review in published {
            count += 1;
            helpful = helpful.saturating_add(review.helpful_votes);
            if review.world_id_verified {
                verified += 1;
            }
        }
        Self {
            reviews_count: count,
            helpful_votes: helpful,
            verified_reviews: verified,
            standing: Standing::from_counts(count, verified, helpful),
        }
    }

    /// Store patch for the user record.
    pub fn to_fields(&self, at: DateTime<Utc>) -> Fields {
        let patch = json!({
            "reviews_count": self.reviews_count,
            "helpful_votes": self.helpful_votes,
            "verified_reviews": self.verified_reviews,
            "reputation_score": self.standing.reputation_score,
            "level": self.standing.level,
            "badge": self.standing.badge,
            "stats_updated_at": at,
        });
        fields(patch).unwrap_or_default()
    }
}

/// Totals of a full recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    /// Businesses whose rollup was rewritten.
    pub businesses: usize,
    /// Users whose rollup was rewritten.
    pub users: usize,
}

/// Recomputes rollups from the store.
pub struct StatsAggregator<S> {
    store: Arc<S>,
}

impl<S> Clone for StatsAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> StatsAggregator<S> {
    /// Create an aggregator over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Recompute a business rollup.
    ///
    /// Returns `None` and writes nothing when the business has no published
    /// reviews.
    pub async fn recompute_business(&self, business_id: &str) -> Result<Option<BusinessRollup>> {
        let filter = Filter::eq("business_id", business_id)
            .and(Filter::eq("status", ReviewStatus::Published.as_str()));
        let reviews = published_reviews(self.store.as_ref(), &filter).await?;

        let Some(rollup) = BusinessRollup::from_ratings(reviews.iter().map(|r| r.rating)) else {
            debug!(business_id, "no published reviews, keeping existing rollup");
            return Ok(None);
        };
        self.store
            .update(BUSINESSES, business_id, rollup.to_fields(Utc::now()))
            .await?;
        debug!(
            business_id,
            average = rollup.average_rating,
            total = rollup.total_reviews,
            "business rollup updated"
        );
        Ok(Some(rollup))
    }

    /// Recompute a user rollup. Returns `None` if no user has this wallet.
    pub async fn recompute_user(&self, wallet: &WalletAddress) -> Result<Option<UserRollup>> {
        let Some(user) = self
            .store
            .first(USERS, &Filter::eq("wallet_address", wallet.as_str()))
            .await?
        else {
            debug!(wallet = %wallet, "no user for wallet, skipping rollup");
            return Ok(None);
        };
        let user: UserRecord = decode(&user)?;

        let filter = Filter::eq("reviewer_address", wallet.as_str())
            .and(Filter::eq("status", ReviewStatus::Published.as_str()));
        let reviews = published_reviews(self.store.as_ref(), &filter).await?;
        let rollup = UserRollup::from_reviews(&reviews);

        self.store
            .update(USERS, &user.id, rollup.to_fields(Utc::now()))
            .await?;
        debug!(
            wallet = %wallet,
            reviews = rollup.reviews_count,
            level = %rollup.standing.level,
            "user rollup updated"
        );
        Ok(Some(rollup))
    }

    /// Recompute every business and user rollup.
    pub async fn recompute_all(&self) -> Result<RecomputeSummary> {
        let mut summary = RecomputeSummary::default();
        for business in self.store.list(BUSINESSES, None).await? {
            if self.recompute_business(&business.id).await?.is_some() {
                summary.businesses += 1;
            }
        }
        for user in self.store.list(USERS, None).await? {
            let user: UserRecord = decode(&user)?;
            if self.recompute_user(&user.wallet_address).await?.is_some() {
                summary.users += 1;
            }
        }
        Ok(summary)
    }
}

pub(crate) async fn published_reviews<S: DocumentStore>(
    store: &S,
    filter: &Filter,
) -> Result<Vec<ReviewRecord>> {
    store
        .list(REVIEWS, Some(filter))
        .await?
        .iter()
        .map(decode)
        .collect()
}
