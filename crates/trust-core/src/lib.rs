//! # trust-core
//!
//! The TrustHub review domain.
//!
//! This crate provides:
//! - Typed records for the `users`, `businesses`, `reviews`, `categories` and
//!   `analytics` collections
//! - The quality scorer and reward calculator
//! - Level, badge and reputation tiers
//! - The statistics aggregator that recomputes business and user rollups
//! - The identity verification cache
//! - [`ReviewService`], which ties submission, scoring and rewards together
//! - [`BusinessService`] for listing registration and search
//!
//! ## Example
//!
//! ```rust
//! use trust_core::{ReviewSignals, reward, score};
//!
//! let quality = score(&ReviewSignals {
//!     text_length: 250,
//!     account_age_days: 30.0,
//!     identity_verified: true,
//!     ..ReviewSignals::default()
//! });
//! assert!((quality.multiplier - 2.2).abs() < 1e-9);
//! assert_eq!(reward(&quality, false), 27);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analytics;
pub mod businesses;
pub mod error;
pub mod identity;
pub mod model;
pub mod reviews;
pub mod reward;
pub mod scoring;
pub mod stats;
pub mod tiers;
pub mod users;
pub mod validation;

pub use analytics::record_event;
pub use businesses::{
    BusinessSearch, BusinessService, BusinessSort, DEFAULT_SEARCH_LIMIT, NewBusiness,
};
pub use error::{CoreError, Result};
pub use identity::{IdentityCache, VERIFICATION_TTL_DAYS, VerificationLevel, VerificationRecord};
pub use model::{
    AnalyticsEvent, BusinessRecord, BusinessStatus, CategoryRecord, ReviewRecord, ReviewStatus,
    UserRecord, decode,
};
pub use reviews::{NewReview, ReviewService, SubmittedReview, content_hash};
pub use reward::{Achievement, RewardSchedule, StreakMilestone, reward};
pub use scoring::{QualityScore, ReviewSignals, score};
pub use stats::{BusinessRollup, RecomputeSummary, StatsAggregator, UserRollup};
pub use tiers::{Badge, Level, MAX_REPUTATION, Standing};
pub use users::{LoginOutcome, UserDirectory};
pub use validation::{slugify, validate_slug};
