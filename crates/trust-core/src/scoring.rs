//! Review quality scoring.
//!
//! Five sub-scores, each capped on its own, sum to an overall score in
//! `[0, 100]`. The overall score maps to a reward multiplier in `[1, 3]`:
//!
//! | signal | points |
//! |---|---|
//! | text length | `min(len / 200 * 30, 30)` |
//! | helpful votes | `min(votes * 5, 25)` |
//! | media attached | 15 |
//! | account age | `min(days / 30 * 15, 15)` |
//! | identity verified | 15 |
//!
//! `multiplier = 1 + overall / 100 * 2`, doubled for the first review of a
//! business, never above [`MAX_MULTIPLIER`].

use serde::{Deserialize, Serialize};

/// Text length that earns full text points.
pub const TEXT_LENGTH_CAP: f64 = 200.0;
/// Maximum text points.
pub const TEXT_POINTS: f64 = 30.0;
/// Points per helpful vote.
pub const POINTS_PER_VOTE: f64 = 5.0;
/// Maximum vote points.
pub const VOTE_POINTS: f64 = 25.0;
/// Points for attached media.
pub const MEDIA_POINTS: f64 = 15.0;
/// Account age in days that earns full age points.
pub const ACCOUNT_AGE_CAP_DAYS: f64 = 30.0;
/// Maximum age points.
pub const AGE_POINTS: f64 = 15.0;
/// Points for an identity-verified author.
pub const IDENTITY_POINTS: f64 = 15.0;
/// Multiplier ceiling.
pub const MAX_MULTIPLIER: f64 = 3.0;

/// Inputs to the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewSignals {
    /// Characters of review text.
    pub text_length: usize,
    /// Helpful votes credited to the author.
    pub helpful_votes: u32,
    /// Photos or video attached.
    pub has_media: bool,
    /// Age of the author's account.
    pub account_age_days: f64,
    /// Author holds a fresh identity verification.
    pub identity_verified: bool,
    /// No published review of the business existed before this one.
    pub is_first_review: bool,
}

/// Scorer output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Text length points.
    pub text_score: f64,
    /// Helpful vote points.
    pub votes_score: f64,
    /// Media points.
    pub media_score: f64,
    /// Account age points.
    pub age_score: f64,
    /// Identity verification points.
    pub identity_score: f64,
    /// Sum of the sub-scores, `[0, 100]`.
    pub overall_score: f64,
    /// Reward multiplier, `[1, 3]`.
    pub multiplier: f64,
    /// Carried through for the reward's verification bonus.
    pub identity_verified: bool,
}

/// Score a review. Out-of-range inputs are clamped, never rejected.
#[must_use]
pub fn score(signals: &ReviewSignals) -> QualityScore {
    let text_score = (signals.text_length as f64 / TEXT_LENGTH_CAP * TEXT_POINTS).min(TEXT_POINTS);
    let votes_score = (f64::from(signals.helpful_votes) * POINTS_PER_VOTE).min(VOTE_POINTS);
    let media_score = if signals.has_media { MEDIA_POINTS } else { 0.0 };
    let age_days = if signals.account_age_days.is_finite() {
        signals.account_age_days.max(0.0)
    } else {
        0.0
    };
    let age_score = (age_days / ACCOUNT_AGE_CAP_DAYS * AGE_POINTS).min(AGE_POINTS);
    let identity_score = if signals.identity_verified { IDENTITY_POINTS } else { 0.0 };

    let overall_score = text_score + votes_score + media_score + age_score + identity_score;

    let mut multiplier = 1.0 + (overall_score / 100.0) * 2.0;
    if signals.is_first_review {
        multiplier *= 2.0;
    }

    QualityScore {
        text_score,
        votes_score,
        media_score,
        age_score,
        identity_score,
        overall_score,
        multiplier: multiplier.clamp(1.0, MAX_MULTIPLIER),
        identity_verified: signals.identity_verified,
    }
}
