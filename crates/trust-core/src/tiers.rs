//! Reputation score, level and badge.
//!
//! All three derive from the same three counters and are only ever computed
//! together through [`Standing::from_counts`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reputation ceiling.
pub const MAX_REPUTATION: u32 = 10_000;

/// Reviewer level, by published review count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    /// Fewer than 5 reviews.
    #[default]
    Beginner,
    /// 5 or more.
    Contributor,
    /// 10 or more.
    #[serde(rename = "Regular Member")]
    RegularMember,
    /// 20 or more.
    #[serde(rename = "Active Member")]
    ActiveMember,
    /// 50 or more.
    #[serde(rename = "Pro Contributor")]
    ProContributor,
    /// 100 or more.
    #[serde(rename = "Expert Reviewer")]
    ExpertReviewer,
}

impl Level {
    const THRESHOLDS: [(u32, Self); 5] = [
        (100, Self::ExpertReviewer),
        (50, Self::ProContributor),
        (20, Self::ActiveMember),
        (10, Self::RegularMember),
        (5, Self::Contributor),
    ];

    /// Level for a review count.
    #[must_use]
    pub fn for_review_count(count: u32) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(min, _)| count >= *min)
            .map_or(Self::Beginner, |(_, level)| *level)
    }

    /// Display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Contributor => "Contributor",
            Self::RegularMember => "Regular Member",
            Self::ActiveMember => "Active Member",
            Self::ProContributor => "Pro Contributor",
            Self::ExpertReviewer => "Expert Reviewer",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer badge. Each tier needs both its verified-review and its
/// helpful-vote minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Badge {
    /// Entry tier.
    #[default]
    Bronze,
    /// 5 verified reviews and 20 helpful votes.
    Silver,
    /// 10 and 50.
    Gold,
    /// 25 and 100.
    Platinum,
    /// 50 and 200.
    Diamond,
}

impl Badge {
    const THRESHOLDS: [(u32, u32, Self); 4] = [
        (50, 200, Self::Diamond),
        (25, 100, Self::Platinum),
        (10, 50, Self::Gold),
        (5, 20, Self::Silver),
    ];

    /// Badge for the given counters.
    #[must_use]
    pub fn for_counts(verified_reviews: u32, helpful_votes: u32) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(verified, helpful, _)| verified_reviews >= *verified && helpful_votes >= *helpful)
            .map_or(Self::Bronze, |(_, _, badge)| *badge)
    }

    /// Display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reputation, level and badge of one reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Standing {
    /// `min(10000, reviews*100 + verified*50 + helpful*10)`.
    pub reputation_score: u32,
    /// Level from the review count.
    pub level: Level,
    /// Badge from verified reviews and helpful votes.
    pub badge: Badge,
}

impl Standing {
    /// Derive all three from one snapshot of counters.
    #[must_use]
    pub fn from_counts(reviews_count: u32, verified_reviews: u32, helpful_votes: u32) -> Self {
        let raw = u64::from(reviews_count) * 100
            + u64::from(verified_reviews) * 50
            + u64::from(helpful_votes) * 10;
        Self {
            reputation_score: raw.min(u64::from(MAX_REPUTATION)) as u32,
            level: Level::for_review_count(reviews_count),
            badge: Badge::for_counts(verified_reviews, helpful_votes),
        }
    }
}
