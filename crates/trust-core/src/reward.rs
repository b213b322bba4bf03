//! Token reward schedule.

use crate::scoring::QualityScore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A streak length that pays a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakMilestone {
    /// Consecutive active days.
    pub days: u32,
    /// Bonus paid on reaching it.
    pub bonus: u64,
}

/// Achievements that pay a one-off reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    /// Wrote a first review.
    FirstReview,
    /// Sustained high-quality reviews.
    QualityReviewer,
    /// Many helpful votes received.
    CommunityHelper,
    /// First to review a business.
    BusinessDiscoverer,
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstReview => write!(f, "first_review"),
            Self::QualityReviewer => write!(f, "quality_reviewer"),
            Self::CommunityHelper => write!(f, "community_helper"),
            Self::BusinessDiscoverer => write!(f, "business_discoverer"),
        }
    }
}

/// Reward amounts, in whole TRH.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSchedule {
    /// Base reward before the quality multiplier.
    pub base_review_reward: u64,
    /// Flat bonus per review by an identity-verified author.
    pub identity_review_bonus: u64,
    /// Flat bonus for the first review of a business.
    pub early_reviewer_bonus: u64,
    /// One-time bonus for verifying identity.
    pub verification_bonus: u64,
    /// Sign-up credit for identity-verified wallets.
    pub welcome_bonus: u64,
    /// Streak milestones.
    pub streaks: Vec<StreakMilestone>,
    /// First review achievement.
    pub first_review_achievement: u64,
    /// Quality reviewer achievement.
    pub quality_reviewer_achievement: u64,
    /// Community helper achievement.
    pub community_helper_achievement: u64,
    /// Business discoverer achievement.
    pub business_discoverer_achievement: u64,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            base_review_reward: 10,
            identity_review_bonus: 5,
            early_reviewer_bonus: 20,
            verification_bonus: 50,
            welcome_bonus: 100,
            streaks: vec![
                StreakMilestone { days: 7, bonus: 50 },
                StreakMilestone { days: 30, bonus: 200 },
                StreakMilestone { days: 90, bonus: 750 },
            ],
            first_review_achievement: 25,
            quality_reviewer_achievement: 100,
            community_helper_achievement: 75,
            business_discoverer_achievement: 50,
        }
    }
}

impl RewardSchedule {
    /// Reward for one review.
    ///
    /// `round(base * multiplier)`, plus the identity bonus when the score
    /// says the author is verified, plus the early-reviewer bonus when the
    /// caller asserts it. The early flag is separate from the scorer's
    /// first-review flag so callers can decide it from fresher data.
    #[must_use]
    pub fn reward(&self, score: &QualityScore, is_early_reviewer: bool) -> u64 {
        let multiplier = if score.multiplier.is_finite() {
            score.multiplier.max(0.0)
        } else {
            1.0
        };
        let mut reward = (self.base_review_reward as f64 * multiplier).round() as u64;
        if score.identity_verified {
            reward = reward.saturating_add(self.identity_review_bonus);
        }
        if is_early_reviewer {
            reward = reward.saturating_add(self.early_reviewer_bonus);
        }
        reward
    }

    /// Bonus for reaching exactly `days` consecutive days, if a milestone.
    #[must_use]
    pub fn streak_bonus(&self, days: u32) -> Option<u64> {
        self.streaks
            .iter()
            .find(|milestone| milestone.days == days)
            .map(|milestone| milestone.bonus)
    }

    /// Reward for an achievement.
    #[must_use]
    pub const fn achievement_reward(&self, achievement: Achievement) -> u64 {
        match achievement {
            Achievement::FirstReview => self.first_review_achievement,
            Achievement::QualityReviewer => self.quality_reviewer_achievement,
            Achievement::CommunityHelper => self.community_helper_achievement,
            Achievement::BusinessDiscoverer => self.business_discoverer_achievement,
        }
    }
}

/// Reward for one review under the default schedule.
#[must_use]
pub fn reward(score: &QualityScore, is_early_reviewer: bool) -> u64 {
    RewardSchedule::default().reward(score, is_early_reviewer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ReviewSignals, score};
    use test_case::test_case;

    fn with_multiplier(multiplier: f64, identity_verified: bool) -> QualityScore {
        QualityScore {
            text_score: 0.0,
            votes_score: 0.0,
            media_score: 0.0,
            age_score: 0.0,
            identity_score: 0.0,
            overall_score: 0.0,
            multiplier,
            identity_verified,
        }
    }

    #[test]
    fn test_base_reward() {
        assert_eq!(reward(&with_multiplier(1.0, false), false), 10);
    }

    #[test_case(2.2, true, false, 27 ; "verified")]
    #[test_case(2.2, false, false, 22 ; "unverified")]
    #[test_case(1.0, false, true, 30 ; "early reviewer")]
    #[test_case(3.0, true, true, 55 ; "everything")]
    #[test_case(1.25, false, false, 13 ; "rounds half away from zero")]
    fn test_reward(multiplier: f64, verified: bool, early: bool, expected: u64) {
        assert_eq!(reward(&with_multiplier(multiplier, verified), early), expected);
    }

    #[test]
    fn test_early_flag_is_independent_of_first_review() {
        let q = score(&ReviewSignals {
            is_first_review: true,
            ..ReviewSignals::default()
        });
        assert_eq!(reward(&q, false), 20);
        assert_eq!(reward(&q, true), 40);
    }

    #[test]
    fn test_streak_bonus_milestones() {
        let schedule = RewardSchedule::default();
        assert_eq!(schedule.streak_bonus(7), Some(50));
        assert_eq!(schedule.streak_bonus(30), Some(200));
        assert_eq!(schedule.streak_bonus(90), Some(750));
        assert_eq!(schedule.streak_bonus(8), None);
    }

    #[test]
    fn test_achievement_rewards() {
        let schedule = RewardSchedule::default();
        assert_eq!(schedule.achievement_reward(Achievement::FirstReview), 25);
        assert_eq!(schedule.achievement_reward(Achievement::QualityReviewer), 100);
        assert_eq!(schedule.achievement_reward(Achievement::CommunityHelper), 75);
        assert_eq!(schedule.achievement_reward(Achievement::BusinessDiscoverer), 50);
    }

    #[test]
    fn test_schedule_deserializes_partially() {
        let schedule: RewardSchedule =
            serde_json::from_str(r#"{ "base_review_reward": 20 }"#).expect("deserialize");
        assert_eq!(schedule.base_review_reward, 20);
        assert_eq!(schedule.verification_bonus, 50);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn reward_is_at_least_base(
                text_length in 0usize..5000,
                helpful_votes in 0u32..200,
                verified in any::<bool>(),
                first in any::<bool>(),
                early in any::<bool>(),
            ) {
                let q = score(&ReviewSignals {
                    text_length,
                    helpful_votes,
                    identity_verified: verified,
                    is_first_review: first,
                    ..ReviewSignals::default()
                });
                let r = reward(&q, early);
                prop_assert!(r >= 10);
                prop_assert!(r <= 30 + 5 + 20);
            }
        }
    }
}
