//! Typed entities of the five collections.
//!
//! Store records are decoded into these types right after retrieval and
//! encoded back with [`trust_store::fields`] on write.

use crate::error::Result;
use crate::tiers::{Badge, Level, Standing};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use trust_store::Record;
use trust_token::WalletAddress;

/// Review lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Visible and counted in rollups.
    #[default]
    Published,
    /// Awaiting moderation.
    Pending,
    /// Removed by moderation.
    Rejected,
    /// Reported and hidden until moderated.
    Flagged,
}

impl ReviewStatus {
    /// Store value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
            Self::Flagged => "flagged",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A review of a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Record ID.
    #[serde(default)]
    pub id: String,
    /// Reviewed business.
    pub business_id: String,
    /// Author wallet, matched by string equality.
    pub reviewer_address: WalletAddress,
    /// Star rating, 1 to 5.
    pub rating: u8,
    /// Optional headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Body text.
    pub content: String,
    /// Author was identity-verified when writing.
    #[serde(default)]
    pub world_id_verified: bool,
    /// Anchored and confirmed on the ledger.
    #[serde(default)]
    pub chain_verified: bool,
    /// Helpful votes received.
    #[serde(default)]
    pub helpful_votes: u32,
    /// Unhelpful votes received.
    #[serde(default)]
    pub not_helpful_votes: u32,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ReviewStatus,
    /// Photos or video attached.
    #[serde(default)]
    pub has_media: bool,
    /// Quality score at submission, 0 to 100.
    #[serde(default)]
    pub quality_score: Option<f64>,
    /// Ledger-side reference.
    #[serde(default)]
    pub blockchain_id: Option<String>,
    /// Ledger transaction that anchored the review.
    #[serde(default)]
    pub tx_hash: Option<String>,
    /// Content hash confirmed by the ledger.
    #[serde(default)]
    pub content_hash: Option<String>,
    /// When the ledger confirmed the review.
    #[serde(default)]
    pub blockchain_confirmed_at: Option<DateTime<Utc>>,
    /// Wallet that attested the review.
    #[serde(default)]
    pub verified_by: Option<String>,
    /// Attestation time.
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    /// Provenance tag set by the migration runner.
    #[serde(default)]
    pub migrated_from: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// Business listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    /// Listed.
    #[default]
    Active,
    /// Awaiting approval.
    Pending,
    /// Hidden.
    Suspended,
}

/// A reviewed business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    /// Record ID.
    #[serde(default)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unique URL slug.
    pub slug: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Website URL.
    #[serde(default)]
    pub website: Option<String>,
    /// Category name.
    #[serde(default)]
    pub category: String,
    /// Owner wallet.
    #[serde(default)]
    pub owner_wallet: Option<String>,
    /// Verified by the platform.
    #[serde(default)]
    pub verified: bool,
    /// Claimed by its owner.
    #[serde(default)]
    pub claimed: bool,
    /// Listing status.
    #[serde(default)]
    pub status: BusinessStatus,
    /// Average published rating, 2 decimals.
    #[serde(default)]
    pub average_rating: f64,
    /// Published review count.
    #[serde(default)]
    pub total_reviews: u32,
    /// One-star reviews.
    #[serde(default)]
    pub rating_1: u32,
    /// Two-star reviews.
    #[serde(default)]
    pub rating_2: u32,
    /// Three-star reviews.
    #[serde(default)]
    pub rating_3: u32,
    /// Four-star reviews.
    #[serde(default)]
    pub rating_4: u32,
    /// Five-star reviews.
    #[serde(default)]
    pub rating_5: u32,
    /// Last rollup time.
    #[serde(default)]
    pub stats_updated_at: Option<DateTime<Utc>>,
    /// Provenance tag set by the migration runner.
    #[serde(default)]
    pub migrated_from: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl BusinessRecord {
    /// Histogram as `[1★, 2★, 3★, 4★, 5★]`.
    #[must_use]
    pub const fn histogram(&self) -> [u32; 5] {
        [self.rating_1, self.rating_2, self.rating_3, self.rating_4, self.rating_5]
    }
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Record ID.
    #[serde(default)]
    pub id: String,
    /// Wallet address, unique per user.
    pub wallet_address: WalletAddress,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Identity proof verified.
    #[serde(default)]
    pub world_id_verified: bool,
    /// Nullifier hash of the identity proof.
    #[serde(default)]
    pub world_id_hash: Option<String>,
    /// Proof strength, e.g. `orb`.
    #[serde(default)]
    pub verification_level: Option<String>,
    /// When the identity proof was verified.
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    /// Derived reputation.
    #[serde(default)]
    pub reputation_score: u32,
    /// Derived level.
    #[serde(default)]
    pub level: Level,
    /// Derived badge.
    #[serde(default)]
    pub badge: Badge,
    /// Published reviews written.
    #[serde(default)]
    pub reviews_count: u32,
    /// Helpful votes across published reviews.
    #[serde(default)]
    pub helpful_votes: u32,
    /// Published reviews written while identity-verified.
    #[serde(default)]
    pub verified_reviews: u32,
    /// Cached ledger balance.
    #[serde(default)]
    pub trh_balance: u64,
    /// When `trh_balance` was last reconciled.
    #[serde(default)]
    pub balance_updated_at: Option<DateTime<Utc>>,
    /// Last sign-in.
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
    /// When the account was opened, if it predates the record.
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    /// Provenance tag set by the migration runner.
    #[serde(default)]
    pub migrated_from: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// A fresh user with default standing.
    #[must_use]
    pub fn new(wallet_address: WalletAddress) -> Self {
        let standing = Standing::default();
        Self {
            id: String::new(),
            wallet_address,
            display_name: None,
            world_id_verified: false,
            world_id_hash: None,
            verification_level: None,
            verified_at: None,
            reputation_score: standing.reputation_score,
            level: standing.level,
            badge: standing.badge,
            reviews_count: 0,
            helpful_votes: 0,
            verified_reviews: 0,
            trh_balance: 0,
            balance_updated_at: None,
            last_active: None,
            joined_at: None,
            migrated_from: None,
            created: None,
        }
    }

    /// Days since the account was opened, `joined_at` or else `created`.
    #[must_use]
    pub fn account_age_days(&self, now: DateTime<Utc>) -> f64 {
        self.joined_at
            .or(self.created)
            .map_or(0.0, |created| (now - created).num_seconds().max(0) as f64 / 86_400.0)
    }
}

/// A business category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Record ID.
    #[serde(default)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unique slug.
    pub slug: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Display order.
    #[serde(default)]
    pub sort_order: u32,
    /// Shown in listings.
    #[serde(default)]
    pub active: bool,
}

/// An analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Event name, e.g. `review_created`.
    pub event_type: String,
    /// Acting wallet.
    #[serde(default)]
    pub user_address: Option<String>,
    /// Related business.
    #[serde(default)]
    pub business_id: Option<String>,
    /// Related review.
    #[serde(default)]
    pub review_id: Option<String>,
    /// Free-form details.
    #[serde(default)]
    pub metadata: Value,
}

impl AnalyticsEvent {
    /// Event without references.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            user_address: None,
            business_id: None,
            review_id: None,
            metadata: Value::Null,
        }
    }
}

/// Decode a store record into a typed entity.
pub fn decode<T: serde::de::DeserializeOwned>(record: &Record) -> Result<T> {
    Ok(record.decode()?)
}
