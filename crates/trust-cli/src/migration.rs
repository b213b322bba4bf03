//! Migration runner.
//!
//! Copies [`Fixtures`] into the document store in dependency order
//! (categories, users, businesses, reviews), recomputes rollups and then
//! checks referential integrity. Every step is idempotent: records that
//! already exist are counted as `updated` and left alone, so a second run
//! creates nothing.
//!
//! Migrated records carry a provenance tag in `migrated_from` plus a
//! `migration_date`. Users are tagged [`USER_PROVENANCE`]; businesses and
//! reviews carry their fixture ID. [`MigrationRunner::rollback`] deletes by
//! that tag.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use trust_core::{
    BusinessRecord, BusinessStatus, CategoryRecord, CoreError, ReviewRecord, ReviewStatus,
    StatsAggregator, Standing, UserRecord, slugify,
};
use trust_store::collections::{BUSINESSES, CATEGORIES, REVIEWS, USERS};
use trust_store::{DocumentStore, Fields, Filter, StoreError, fields};
use trust_token::WalletAddress;

use crate::fixtures::{FixtureBusiness, FixtureReview, Fixtures};

/// Provenance tag of migrated users.
pub const USER_PROVENANCE: &str = "fixture_data";

/// Field holding the provenance tag.
pub const MIGRATED_FROM: &str = "migrated_from";

/// Field holding the migration timestamp.
pub const MIGRATION_DATE: &str = "migration_date";

/// Quality score given to migrated reviews, 0 to 100.
const MIGRATED_QUALITY_SCORE: f64 = 80.0;

/// Result type alias for migration operations.
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;

/// Errors that abort a migration step.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Fixture content is incomplete or inconsistent.
    #[error("invalid fixtures: {message}")]
    Validation {
        /// What is wrong.
        message: String,
    },

    /// Fixture file could not be read or parsed.
    #[error("cannot load fixtures: {message}")]
    Fixtures {
        /// Underlying cause.
        message: String,
    },

    /// Post-migration check found orphans or missing records.
    #[error("integrity check failed: {message}")]
    Integrity {
        /// Every problem found.
        message: String,
    },

    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Rollup recompute failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl MigrationError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a fixture loading error.
    #[must_use]
    pub fn fixtures(message: impl Into<String>) -> Self {
        Self::Fixtures {
            message: message.into(),
        }
    }

    /// Create an integrity error.
    #[must_use]
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// Severity of a migration log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress.
    Info,
    /// A record failed; the run goes on.
    Warn,
    /// The run failed.
    Error,
}

/// One line of the migration log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When it was logged.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Message.
    pub message: String,
}

/// Per-kind counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindStats {
    /// Records written.
    pub created: usize,
    /// Records that already existed.
    pub updated: usize,
    /// Records that could not be migrated.
    pub failed: usize,
    /// One message per failure.
    pub errors: Vec<String>,
}

impl KindStats {
    fn record(&mut self, log: &mut MigrationLog, what: String, outcome: MigrationResult<Outcome>) {
        match outcome {
            Ok(Outcome::Created) => self.created += 1,
            Ok(Outcome::Existing) => self.updated += 1,
            Err(e) => {
                self.failed += 1;
                let message = format!("{what}: {e}");
                log.warn(message.clone());
                self.errors.push(message);
            }
        }
    }
}

/// Result of [`MigrationRunner::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Every step completed and the integrity check passed.
    pub success: bool,
    /// Wall time in milliseconds.
    pub execution_ms: u64,
    /// Categories.
    pub categories: KindStats,
    /// Users.
    pub users: KindStats,
    /// Businesses.
    pub businesses: KindStats,
    /// Reviews.
    pub reviews: KindStats,
    /// The error that aborted the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Everything logged during the run.
    pub log: Vec<LogEntry>,
}

/// Records removed by [`MigrationRunner::rollback`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackCounts {
    /// Reviews deleted.
    pub reviews: usize,
    /// Businesses deleted.
    pub businesses: usize,
    /// Users deleted.
    pub users: usize,
}

/// Snapshot returned by [`MigrationRunner::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// Store health check result.
    pub store_health: String,
    /// All users.
    pub users: usize,
    /// All businesses.
    pub businesses: usize,
    /// All reviews.
    pub reviews: usize,
    /// All categories.
    pub categories: usize,
    /// Users tagged by the migration.
    pub migrated_users: usize,
    /// Businesses tagged by the migration.
    pub migrated_businesses: usize,
    /// Reviews tagged by the migration.
    pub migrated_reviews: usize,
    /// Newest `migration_date` across tagged records.
    pub last_migration: Option<DateTime<Utc>>,
}

enum Outcome {
    Created,
    Existing,
}

#[derive(Default)]
struct MigrationLog {
    entries: Vec<LogEntry>,
}

impl MigrationLog {
    fn push(&mut self, level: LogLevel, message: String) {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.push(LogLevel::Info, message);
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.push(LogLevel::Warn, message);
    }

    fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.push(LogLevel::Error, message);
    }
}

#[derive(Default)]
struct Run {
    log: MigrationLog,
    categories: KindStats,
    users: KindStats,
    businesses: KindStats,
    reviews: KindStats,
}

/// Runs, inspects and rolls back fixture migrations.
pub struct MigrationRunner<S> {
    store: Arc<S>,
    fixtures: Fixtures,
}

impl<S: DocumentStore> MigrationRunner<S> {
    /// Create a runner copying `fixtures` into `store`.
    pub fn new(store: Arc<S>, fixtures: Fixtures) -> Self {
        Self { store, fixtures }
    }

    /// The target store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The fixtures this runner migrates.
    pub fn fixtures(&self) -> &Fixtures {
        &self.fixtures
    }

    /// Round trip to the store.
    pub async fn health_check(&self) -> MigrationResult<()> {
        Ok(self.store.health_check().await?)
    }

    /// Run the full migration.
    ///
    /// Record-level failures are counted and logged; validation, rollup and
    /// integrity failures abort the run with `success: false`.
    pub async fn run(&self) -> MigrationReport {
        let started = Instant::now();
        let mut run = Run::default();
        run.log.info(format!(
            "starting migration of {} businesses and {} reviews",
            self.fixtures.businesses.len(),
            self.fixtures.reviews.len()
        ));

        let outcome = self.execute(&mut run).await;
        let execution_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let error = match outcome {
            Ok(()) => {
                run.log.info(format!("migration completed in {execution_ms} ms"));
                None
            }
            Err(e) => {
                run.log.error(format!("migration failed: {e}"));
                Some(e.to_string())
            }
        };

        MigrationReport {
            success: error.is_none(),
            execution_ms,
            categories: run.categories,
            users: run.users,
            businesses: run.businesses,
            reviews: run.reviews,
            error,
            log: run.log.entries,
        }
    }

    async fn execute(&self, run: &mut Run) -> MigrationResult<()> {
        self.fixtures.validate()?;
        run.log.info("fixtures validated");

        let migrated_at = Utc::now();

        for (index, name) in self.fixtures.categories().into_iter().enumerate() {
            let outcome = self.migrate_category(name, index).await;
            run.categories
                .record(&mut run.log, format!("category {name}"), outcome);
        }
        run.log.info(format!(
            "categories: {} created, {} existing",
            run.categories.created, run.categories.updated
        ));

        for wallet in self.fixtures.reviewers() {
            let outcome = self.migrate_user(wallet, migrated_at).await;
            run.users.record(&mut run.log, format!("user {wallet}"), outcome);
        }
        run.log.info(format!(
            "users: {} created, {} existing, {} failed",
            run.users.created, run.users.updated, run.users.failed
        ));

        let mut business_ids = HashMap::new();
        for business in &self.fixtures.businesses {
            let outcome = match self.migrate_business(business, migrated_at).await {
                Ok((outcome, id)) => {
                    business_ids.insert(business.id.as_str(), id);
                    Ok(outcome)
                }
                Err(e) => Err(e),
            };
            run.businesses
                .record(&mut run.log, format!("business {}", business.slug), outcome);
        }
        run.log.info(format!(
            "businesses: {} created, {} existing, {} failed",
            run.businesses.created, run.businesses.updated, run.businesses.failed
        ));

        for review in &self.fixtures.reviews {
            let outcome = self.migrate_review(review, &business_ids, migrated_at).await;
            run.reviews
                .record(&mut run.log, format!("review {}", review.id), outcome);
        }
        run.log.info(format!(
            "reviews: {} created, {} existing, {} failed",
            run.reviews.created, run.reviews.updated, run.reviews.failed
        ));

        let summary = StatsAggregator::new(Arc::clone(&self.store))
            .recompute_all()
            .await?;
        run.log.info(format!(
            "recomputed rollups for {} businesses and {} users",
            summary.businesses, summary.users
        ));

        self.check_integrity().await?;
        run.log.info("integrity check passed");
        Ok(())
    }

    async fn migrate_category(&self, name: &str, index: usize) -> MigrationResult<Outcome> {
        let slug = slugify(name);
        if self
            .store
            .first(CATEGORIES, &Filter::eq("slug", slug.as_str()))
            .await?
            .is_some()
        {
            return Ok(Outcome::Existing);
        }

        let category = CategoryRecord {
            id: String::new(),
            name: name.to_string(),
            slug,
            description: format!("{name} businesses and services"),
            sort_order: u32::try_from(index).unwrap_or(u32::MAX),
            active: true,
        };
        self.store.create(CATEGORIES, fields(&category)?).await?;
        Ok(Outcome::Created)
    }

    async fn migrate_user(&self, wallet: &str, migrated_at: DateTime<Utc>) -> MigrationResult<Outcome> {
        let address = WalletAddress::parse(wallet)
            .map_err(|e| MigrationError::validation(format!("wallet {wallet}: {e}")))?;
        if self
            .store
            .first(USERS, &Filter::eq("wallet_address", address.as_str()))
            .await?
            .is_some()
        {
            return Ok(Outcome::Existing);
        }

        let (mut count, mut verified, mut helpful) = (0u32, 0u32, 0u32);
        for review in self.fixtures.reviews_by(wallet) {
            count += 1;
            helpful = helpful.saturating_add(review.likes);
            if review.verified {
                verified += 1;
            }
        }
        let standing = Standing::from_counts(count, verified, helpful);

        let mut user = UserRecord::new(address);
        user.display_name = self.fixtures.display_name(wallet).map(str::to_string);
        user.world_id_verified = count > 0 && verified == count;
        user.reputation_score = standing.reputation_score;
        user.level = standing.level;
        user.badge = standing.badge;
        user.reviews_count = count;
        user.verified_reviews = verified;
        user.helpful_votes = helpful;
        user.migrated_from = Some(USER_PROVENANCE.to_string());

        self.store
            .create(USERS, tagged(&user, migrated_at)?)
            .await?;
        Ok(Outcome::Created)
    }

    async fn migrate_business(
        &self,
        fixture: &FixtureBusiness,
        migrated_at: DateTime<Utc>,
    ) -> MigrationResult<(Outcome, String)> {
        if let Some(existing) = self
            .store
            .first(BUSINESSES, &Filter::eq("slug", fixture.slug.as_str()))
            .await?
        {
            return Ok((Outcome::Existing, existing.id));
        }

        let [rating_1, rating_2, rating_3, rating_4, rating_5] = fixture.ratings;
        let business = BusinessRecord {
            id: String::new(),
            name: fixture.name.clone(),
            slug: fixture.slug.clone(),
            description: fixture.description.clone(),
            website: fixture.website.clone(),
            category: fixture.category.clone(),
            owner_wallet: None,
            verified: false,
            claimed: false,
            status: BusinessStatus::Active,
            average_rating: fixture.average_rating,
            total_reviews: fixture.total_reviews,
            rating_1,
            rating_2,
            rating_3,
            rating_4,
            rating_5,
            stats_updated_at: None,
            migrated_from: Some(fixture.id.clone()),
            created: None,
        };
        let record = self
            .store
            .create(BUSINESSES, tagged(&business, migrated_at)?)
            .await?;
        Ok((Outcome::Created, record.id))
    }

    async fn migrate_review(
        &self,
        fixture: &FixtureReview,
        business_ids: &HashMap<&str, String>,
        migrated_at: DateTime<Utc>,
    ) -> MigrationResult<Outcome> {
        let business_id = business_ids.get(fixture.business_id.as_str()).ok_or_else(|| {
            MigrationError::validation(format!("business {} was not migrated", fixture.business_id))
        })?;
        if self
            .store
            .first(REVIEWS, &Filter::eq(MIGRATED_FROM, fixture.id.as_str()))
            .await?
            .is_some()
        {
            return Ok(Outcome::Existing);
        }

        let reviewer = WalletAddress::parse(&fixture.reviewer_address).map_err(|e| {
            MigrationError::validation(format!("wallet {}: {e}", fixture.reviewer_address))
        })?;
        let review = ReviewRecord {
            id: String::new(),
            business_id: business_id.clone(),
            reviewer_address: reviewer,
            rating: fixture.rating,
            title: fixture.title.clone(),
            content: fixture.content.clone(),
            world_id_verified: fixture.verified,
            chain_verified: false,
            helpful_votes: fixture.likes,
            not_helpful_votes: fixture.dislikes,
            status: ReviewStatus::Published,
            has_media: false,
            quality_score: Some(MIGRATED_QUALITY_SCORE),
            blockchain_id: None,
            tx_hash: None,
            content_hash: None,
            blockchain_confirmed_at: None,
            verified_by: None,
            verified_at: None,
            migrated_from: Some(fixture.id.clone()),
            created: None,
        };
        self.store
            .create(REVIEWS, tagged(&review, migrated_at)?)
            .await?;
        Ok(Outcome::Created)
    }

    async fn check_integrity(&self) -> MigrationResult<()> {
        let businesses = self.store.list(BUSINESSES, None).await?;
        let reviews = self.store.list(REVIEWS, None).await?;
        let mut problems = Vec::new();

        if businesses.len() < self.fixtures.businesses.len() {
            problems.push(format!(
                "expected at least {} businesses, found {}",
                self.fixtures.businesses.len(),
                businesses.len()
            ));
        }
        if reviews.len() < self.fixtures.reviews.len() {
            problems.push(format!(
                "expected at least {} reviews, found {}",
                self.fixtures.reviews.len(),
                reviews.len()
            ));
        }

        let known: HashSet<&str> = businesses.iter().map(|b| b.id.as_str()).collect();
        let orphans = reviews
            .iter()
            .filter(|r| {
                r.str_field("business_id")
                    .is_none_or(|id| id.is_empty() || !known.contains(id))
            })
            .count();
        if orphans > 0 {
            problems.push(format!("{orphans} reviews reference no existing business"));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::integrity(problems.join("; ")))
        }
    }

    /// Delete every migrated review, business and user.
    ///
    /// Categories are kept; they carry no provenance tag.
    pub async fn rollback(&self) -> MigrationResult<RollbackCounts> {
        let tagged_filter = Filter::ne(MIGRATED_FROM, "");
        let counts = RollbackCounts {
            reviews: self.delete_matching(REVIEWS, &tagged_filter).await?,
            businesses: self.delete_matching(BUSINESSES, &tagged_filter).await?,
            users: self
                .delete_matching(USERS, &Filter::eq(MIGRATED_FROM, USER_PROVENANCE))
                .await?,
        };
        info!(
            reviews = counts.reviews,
            businesses = counts.businesses,
            users = counts.users,
            "migration rolled back"
        );
        Ok(counts)
    }

    async fn delete_matching(&self, collection: &str, filter: &Filter) -> MigrationResult<usize> {
        let records = self.store.list(collection, Some(filter)).await?;
        for record in &records {
            self.store.delete(collection, &record.id).await?;
        }
        Ok(records.len())
    }

    /// Collection counts and migration provenance. Does not write.
    pub async fn status(&self) -> MigrationResult<MigrationStatus> {
        self.store.health_check().await?;

        let tagged_filter = Filter::ne(MIGRATED_FROM, "");
        let migrated_users = self
            .store
            .list(USERS, Some(&Filter::eq(MIGRATED_FROM, USER_PROVENANCE)))
            .await?;
        let migrated_businesses = self.store.list(BUSINESSES, Some(&tagged_filter)).await?;
        let migrated_reviews = self.store.list(REVIEWS, Some(&tagged_filter)).await?;

        let last_migration = migrated_users
            .iter()
            .chain(&migrated_businesses)
            .chain(&migrated_reviews)
            .filter_map(|r| r.str_field(MIGRATION_DATE))
            .filter_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc))
            .max();

        Ok(MigrationStatus {
            store_health: "ok".to_string(),
            users: self.store.count(USERS, None).await?,
            businesses: self.store.count(BUSINESSES, None).await?,
            reviews: self.store.count(REVIEWS, None).await?,
            categories: self.store.count(CATEGORIES, None).await?,
            migrated_users: migrated_users.len(),
            migrated_businesses: migrated_businesses.len(),
            migrated_reviews: migrated_reviews.len(),
            last_migration,
        })
    }
}

/// Record fields of `entity` stamped with the migration date.
fn tagged<T: Serialize>(entity: &T, migrated_at: DateTime<Utc>) -> MigrationResult<Fields> {
    let mut fields = fields(entity)?;
    fields.insert(MIGRATION_DATE.to_string(), Value::String(migrated_at.to_rfc3339()));
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trust_core::{Badge, Level, decode};
    use trust_store::MemoryStore;

    fn runner() -> MigrationRunner<MemoryStore> {
        let fixtures = Fixtures::embedded().expect("seed");
        MigrationRunner::new(Arc::new(MemoryStore::new()), fixtures)
    }

    async fn business_by_slug(store: &MemoryStore, slug: &str) -> BusinessRecord {
        let record = store
            .first(BUSINESSES, &Filter::eq("slug", slug))
            .await
            .expect("list")
            .expect("business exists");
        decode(&record).expect("decode")
    }

    #[tokio::test]
    async fn test_run_creates_everything() {
        let runner = runner();
        let report = runner.run().await;

        assert!(report.success, "report: {report:?}");
        assert_eq!(report.categories.created, 3);
        assert_eq!(report.users.created, 4);
        assert_eq!(report.businesses.created, 3);
        assert_eq!(report.reviews.created, 5);
        assert!(report.error.is_none());
        assert!(report.log.iter().any(|e| e.message == "integrity check passed"));

        let store = runner.store();
        assert_eq!(store.count(REVIEWS, None).await.expect("count"), 5);
        assert_eq!(store.count(CATEGORIES, None).await.expect("count"), 3);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let runner = runner();
        assert!(runner.run().await.success);

        let report = runner.run().await;
        assert!(report.success);
        assert_eq!(report.categories.created, 0);
        assert_eq!(report.users.created, 0);
        assert_eq!(report.users.updated, 4);
        assert_eq!(report.businesses.updated, 3);
        assert_eq!(report.reviews.updated, 5);
        assert_eq!(runner.store().count(REVIEWS, None).await.expect("count"), 5);
    }

    #[tokio::test]
    async fn test_rollups_recomputed_from_migrated_reviews() {
        let runner = runner();
        assert!(runner.run().await.success);
        let store = runner.store();

        // Ratings 5, 4, 5, 5.
        let grind = business_by_slug(store, "the-daily-grind").await;
        assert_eq!(grind.total_reviews, 4);
        assert!((grind.average_rating - 4.75).abs() < f64::EPSILON);
        assert_eq!(grind.histogram(), [0, 0, 0, 1, 3]);
        assert_eq!(grind.migrated_from.as_deref(), Some("1"));

        // No migrated reviews: the listed rollup stays.
        let eats = business_by_slug(store, "urban-eats").await;
        assert_eq!(eats.total_reviews, 256);
        assert!((eats.average_rating - 4.8).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_users_tagged_with_derived_standing() {
        let runner = runner();
        assert!(runner.run().await.success);

        let record = runner
            .store()
            .first(USERS, &Filter::eq("wallet_address", "0x123...456"))
            .await
            .expect("list")
            .expect("user exists");
        let user: UserRecord = decode(&record).expect("decode");
        assert_eq!(user.display_name.as_deref(), Some("You"));
        assert_eq!(user.migrated_from.as_deref(), Some(USER_PROVENANCE));
        assert!(user.world_id_verified);
        assert_eq!(user.reviews_count, 2);
        assert_eq!(user.helpful_votes, 8);
        // 2*100 + 2*50 + 8*10
        assert_eq!(user.reputation_score, 380);
        assert_eq!(user.level, Level::Beginner);
        assert_eq!(user.badge, Badge::Bronze);
        assert!(record.str_field(MIGRATION_DATE).is_some());
    }

    #[tokio::test]
    async fn test_existing_user_left_untouched() {
        let runner = runner();
        let mut existing = UserRecord::new(WalletAddress::parse("0x1234...5678").expect("addr"));
        existing.display_name = Some("Sophia".into());
        runner
            .store()
            .create(USERS, fields(&existing).expect("fields"))
            .await
            .expect("create");

        let report = runner.run().await;
        assert!(report.success);
        assert_eq!(report.users.created, 3);
        assert_eq!(report.users.updated, 1);

        let status = runner.status().await.expect("status");
        assert_eq!(status.users, 4);
        assert_eq!(status.migrated_users, 3);
    }

    #[tokio::test]
    async fn test_unknown_business_fails_integrity() {
        let mut fixtures = Fixtures::embedded().expect("seed");
        fixtures.reviews[0].business_id = "99".into();
        let runner = MigrationRunner::new(Arc::new(MemoryStore::new()), fixtures);

        let report = runner.run().await;
        assert!(!report.success);
        assert_eq!(report.reviews.failed, 1);
        assert!(report.reviews.errors[0].contains("business 99 was not migrated"));
        let error = report.error.expect("error set");
        assert!(error.contains("integrity check failed"), "{error}");
        assert!(report.log.iter().any(|e| e.level == LogLevel::Error));
    }

    #[tokio::test]
    async fn test_invalid_fixtures_abort_before_writing() {
        let mut fixtures = Fixtures::embedded().expect("seed");
        fixtures.businesses[1].name = String::new();
        let runner = MigrationRunner::new(Arc::new(MemoryStore::new()), fixtures);

        let report = runner.run().await;
        assert!(!report.success);
        assert!(report.error.expect("error").contains("missing name"));
        assert_eq!(runner.store().count(CATEGORIES, None).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_offline_store_fails_run() {
        let runner = runner();
        runner.store().set_online(false);
        assert!(runner.health_check().await.is_err());

        let report = runner.run().await;
        assert!(!report.success);
        assert_eq!(report.users.failed, 4);
        assert!(runner.status().await.is_err());
    }

    #[tokio::test]
    async fn test_rollback_removes_only_tagged_records() {
        let runner = runner();
        assert!(runner.run().await.success);
        let store = runner.store();
        store
            .create(
                BUSINESSES,
                fields(serde_json::json!({ "name": "Corner Deli", "slug": "corner-deli" }))
                    .expect("fields"),
            )
            .await
            .expect("create");

        let counts = runner.rollback().await.expect("rollback");
        assert_eq!(
            counts,
            RollbackCounts {
                reviews: 5,
                businesses: 3,
                users: 4
            }
        );

        let status = runner.status().await.expect("status");
        assert_eq!(status.businesses, 1);
        assert_eq!(status.reviews, 0);
        assert_eq!(status.users, 0);
        assert_eq!(status.categories, 3);
        assert!(status.last_migration.is_none());
    }

    #[tokio::test]
    async fn test_status_reports_provenance() {
        let runner = runner();
        let before = runner.status().await.expect("status");
        assert_eq!(before.migrated_reviews, 0);
        assert!(before.last_migration.is_none());

        let started = Utc::now();
        assert!(runner.run().await.success);

        let status = runner.status().await.expect("status");
        assert_eq!(status.store_health, "ok");
        assert_eq!(status.migrated_users, 4);
        assert_eq!(status.migrated_businesses, 3);
        assert_eq!(status.migrated_reviews, 5);
        let last = status.last_migration.expect("migration date");
        assert!(last >= started - chrono::Duration::seconds(1));
    }
}
