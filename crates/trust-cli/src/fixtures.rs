//! Seed data copied into the document store by the migration.
//!
//! The embedded seed lives in `fixtures/seed.json`; `--fixtures FILE` swaps in
//! another file with the same shape.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use trust_token::WalletAddress;

use crate::migration::{MigrationError, MigrationResult};

const EMBEDDED_SEED: &str = include_str!("../fixtures/seed.json");

/// A business to migrate, carrying the rollup it was listed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureBusiness {
    /// Fixture ID, stored as the provenance tag.
    pub id: String,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Category name.
    pub category: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Website.
    #[serde(default)]
    pub website: Option<String>,
    /// Listed average rating.
    #[serde(default)]
    pub average_rating: f64,
    /// Listed review count.
    #[serde(default)]
    pub total_reviews: u32,
    /// Listed histogram as `[1★, 2★, 3★, 4★, 5★]`.
    #[serde(default)]
    pub ratings: [u32; 5],
}

/// A review to migrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureReview {
    /// Fixture ID, stored as the provenance tag.
    pub id: String,
    /// Fixture ID of the reviewed business.
    pub business_id: String,
    /// Author wallet.
    pub reviewer_address: String,
    /// Author display name.
    #[serde(default)]
    pub reviewer_name: Option<String>,
    /// Star rating.
    pub rating: u8,
    /// Headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Body text.
    pub content: String,
    /// Author was identity-verified.
    #[serde(default)]
    pub verified: bool,
    /// Helpful votes.
    #[serde(default)]
    pub likes: u32,
    /// Unhelpful votes.
    #[serde(default)]
    pub dislikes: u32,
}

/// Display details for a reviewer that the reviews do not carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureProfile {
    /// Wallet the profile belongs to.
    pub wallet_address: String,
    /// Display name.
    pub display_name: String,
}

/// The full fixture set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Fixtures {
    /// Businesses.
    #[serde(default)]
    pub businesses: Vec<FixtureBusiness>,
    /// Reviews.
    #[serde(default)]
    pub reviews: Vec<FixtureReview>,
    /// Reviewer profiles.
    #[serde(default)]
    pub profiles: Vec<FixtureProfile>,
}

impl Fixtures {
    /// The seed compiled into the binary.
    pub fn embedded() -> MigrationResult<Self> {
        Self::from_json(EMBEDDED_SEED)
    }

    /// Load fixtures from a JSON file.
    pub fn from_file(path: &Path) -> MigrationResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::fixtures(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Parse fixtures from JSON text.
    pub fn from_json(raw: &str) -> MigrationResult<Self> {
        serde_json::from_str(raw).map_err(|e| MigrationError::fixtures(e.to_string()))
    }

    /// Embedded seed, or `path` when given.
    pub fn load(path: Option<&Path>) -> MigrationResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::embedded(),
        }
    }

    /// Check required fields and ID uniqueness.
    ///
    /// Businesses need an id, name and slug; reviews need an id, business,
    /// reviewer, content and a rating from 1 to 5.
    pub fn validate(&self) -> MigrationResult<()> {
        let mut problems = Vec::new();

        let mut business_ids = HashSet::new();
        for (index, business) in self.businesses.iter().enumerate() {
            for (field, value) in [
                ("id", &business.id),
                ("name", &business.name),
                ("slug", &business.slug),
            ] {
                if value.trim().is_empty() {
                    problems.push(format!("business #{index}: missing {field}"));
                }
            }
            if !business_ids.insert(business.id.as_str()) {
                problems.push(format!("business #{index}: duplicate id {}", business.id));
            }
        }

        let mut review_ids = HashSet::new();
        for (index, review) in self.reviews.iter().enumerate() {
            for (field, value) in [
                ("id", &review.id),
                ("business_id", &review.business_id),
                ("reviewer_address", &review.reviewer_address),
                ("content", &review.content),
            ] {
                if value.trim().is_empty() {
                    problems.push(format!("review #{index}: missing {field}"));
                }
            }
            if !review.reviewer_address.trim().is_empty()
                && WalletAddress::parse(&review.reviewer_address).is_err()
            {
                problems.push(format!("review #{index}: invalid reviewer_address"));
            }
            if !(1..=5).contains(&review.rating) {
                problems.push(format!("review #{index}: rating {} out of range", review.rating));
            }
            if !review_ids.insert(review.id.as_str()) {
                problems.push(format!("review #{index}: duplicate id {}", review.id));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::validation(problems.join("; ")))
        }
    }

    /// Category names in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.businesses
            .iter()
            .map(|b| b.category.as_str())
            .filter(|c| !c.trim().is_empty() && seen.insert(*c))
            .collect()
    }

    /// Reviewer wallets in first-seen order.
    pub fn reviewers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.reviews
            .iter()
            .map(|r| r.reviewer_address.as_str())
            .filter(|w| seen.insert(*w))
            .collect()
    }

    /// Reviews written by `wallet`.
    pub fn reviews_by<'a>(&'a self, wallet: &str) -> impl Iterator<Item = &'a FixtureReview> {
        self.reviews.iter().filter(move |r| r.reviewer_address == wallet)
    }

    /// Display name for `wallet`: its profile, else the name on its reviews.
    pub fn display_name(&self, wallet: &str) -> Option<&str> {
        self.profiles
            .iter()
            .find(|p| p.wallet_address == wallet)
            .map(|p| p.display_name.as_str())
            .or_else(|| self.reviews_by(wallet).find_map(|r| r.reviewer_name.as_deref()))
    }
}
