//! Business registration, lookup and search.
//!
//! Owners register listings through [`BusinessService::create`]. New
//! listings start out `pending` and only `active` ones are visible to
//! [`BusinessService::by_slug`] and [`BusinessService::search`].

use crate::error::{CoreError, Result};
use crate::model::{BusinessRecord, BusinessStatus, decode};
use crate::validation::{slugify, validate_slug};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};
use trust_store::collections::BUSINESSES;
use trust_store::{CompareOp, DocumentStore, Filter, Record, fields};
use trust_token::WalletAddress;

/// Results returned by a search when no limit is given.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// A listing as submitted by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBusiness {
    /// Display name.
    pub name: String,
    /// URL slug; derived from the name when absent.
    #[serde(default)]
    pub slug: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Website URL.
    #[serde(default)]
    pub website: Option<String>,
    /// Category name.
    #[serde(default)]
    pub category: String,
    /// Registering wallet.
    pub owner_wallet: WalletAddress,
}

/// Result ordering for [`BusinessService::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessSort {
    /// Highest average rating, then most reviews.
    Rating,
    /// Most reviews, then highest average rating.
    Reviews,
    /// Newest listings first.
    #[default]
    Newest,
}

/// Parameters of a business search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessSearch {
    /// Case-insensitive text matched against name, description and category.
    pub query: Option<String>,
    /// Extra filter expression in the store's query language.
    pub filter: Option<String>,
    /// Result ordering.
    pub sort: BusinessSort,
    /// Maximum results.
    pub limit: usize,
}

impl Default for BusinessSearch {
    fn default() -> Self {
        Self {
            query: None,
            filter: None,
            sort: BusinessSort::default(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Business listings over a document store.
pub struct BusinessService<S> {
    store: Arc<S>,
    // Held across the slug check and the insert.
    registrations: Arc<tokio::sync::Mutex<()>>,
}

impl<S> Clone for BusinessService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registrations: Arc::clone(&self.registrations),
        }
    }
}

impl<S: DocumentStore> BusinessService<S> {
    /// Create a service over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            registrations: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Register a listing. It is stored `pending` and claimed by its owner,
    /// with empty rating rollups.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a blank name, a malformed slug
    /// or a slug that is already taken.
    pub async fn create(&self, new: NewBusiness) -> Result<BusinessRecord> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("name", "must not be empty"));
        }
        let slug = match new.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => slug.to_string(),
            None => slugify(name),
        };
        validate_slug(&slug)?;

        let _guard = self.registrations.lock().await;
        if self.store.first(BUSINESSES, &Filter::eq("slug", slug.as_str())).await?.is_some() {
            return Err(CoreError::validation("slug", format!("'{slug}' is already taken")));
        }

        let record = self
            .store
            .create(
                BUSINESSES,
                fields(json!({
                    "name": name,
                    "slug": slug,
                    "description": new.description.trim(),
                    "website": new.website,
                    "category": new.category.trim(),
                    "owner_wallet": new.owner_wallet,
                    "verified": false,
                    "claimed": true,
                    "status": BusinessStatus::Pending,
                    "average_rating": 0.0,
                    "total_reviews": 0,
                    "rating_1": 0,
                    "rating_2": 0,
                    "rating_3": 0,
                    "rating_4": 0,
                    "rating_5": 0,
                }))?,
            )
            .await?;
        info!(business_id = %record.id, slug = %slug, owner = %new.owner_wallet, "business registered");
        decode(&record)
    }

    /// The active listing with `slug`, if any.
    pub async fn by_slug(&self, slug: &str) -> Result<Option<BusinessRecord>> {
        let Some(record) = self.store.first(BUSINESSES, &Filter::eq("slug", slug)).await? else {
            return Ok(None);
        };
        let business: BusinessRecord = decode(&record)?;
        if business.status == BusinessStatus::Active {
            Ok(Some(business))
        } else {
            debug!(slug, status = ?business.status, "business is not listed");
            Ok(None)
        }
    }

    /// Active listings matching `search`, ordered and truncated.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] when the filter expression does not
    /// parse or the store fails.
    pub async fn search(&self, search: &BusinessSearch) -> Result<Vec<BusinessRecord>> {
        let text = search
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| {
                Filter::compare("name", CompareOp::Like, q)
                    .or(Filter::compare("description", CompareOp::Like, q))
                    .or(Filter::compare("category", CompareOp::Like, q))
            });
        let extra = search.filter.as_deref().map(Filter::parse).transpose()?;
        let filter = match (text, extra) {
            (Some(text), Some(extra)) => Some(text.and(extra)),
            (text, extra) => text.or(extra),
        };

        let mut matches = Vec::new();
        for record in self.store.list(BUSINESSES, filter.as_ref()).await? {
            let business: BusinessRecord = decode(&record)?;
            // Listings without a status predate moderation and count as active.
            if business.status == BusinessStatus::Active {
                matches.push((record, business));
            }
        }
        matches.sort_by(|a, b| compare(search.sort, a, b));
        debug!(
            query = ?search.query,
            sort = ?search.sort,
            matches = matches.len(),
            "business search"
        );

        Ok(matches
            .into_iter()
            .take(search.limit)
            .map(|(_, business)| business)
            .collect())
    }
}

fn compare(sort: BusinessSort, a: &(Record, BusinessRecord), b: &(Record, BusinessRecord)) -> Ordering {
    let (ra, a) = a;
    let (rb, b) = b;
    let by_rating = || b.average_rating.total_cmp(&a.average_rating);
    let by_reviews = || b.total_reviews.cmp(&a.total_reviews);
    match sort {
        BusinessSort::Rating => by_rating().then_with(by_reviews),
        BusinessSort::Reviews => by_reviews().then_with(by_rating),
        BusinessSort::Newest => rb.created.cmp(&ra.created),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trust_store::MemoryStore;

    fn service() -> (Arc<MemoryStore>, BusinessService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), BusinessService::new(store))
    }

    fn owner() -> WalletAddress {
        WalletAddress::parse("0xowner").expect("valid address")
    }

    fn listing(name: &str) -> NewBusiness {
        NewBusiness {
            name: name.to_string(),
            slug: None,
            description: String::new(),
            website: None,
            category: "restaurant".into(),
            owner_wallet: owner(),
        }
    }

    async fn seed(store: &MemoryStore, name: &str, slug: &str, extra: serde_json::Value) -> String {
        let mut record = fields(json!({ "name": name, "slug": slug, "status": "active" }))
            .expect("fields");
        record.extend(fields(extra).expect("fields"));
        store.create(BUSINESSES, record).await.expect("create").id
    }

    #[tokio::test]
    async fn create_derives_slug_and_starts_pending() {
        let (_, service) = service();
        let business = service
            .create(listing("Tech Solutions Inc."))
            .await
            .expect("create");

        assert_eq!(business.slug, "tech-solutions-inc");
        assert_eq!(business.status, BusinessStatus::Pending);
        assert!(business.claimed);
        assert!(!business.verified);
        assert_eq!(business.owner_wallet.as_deref(), Some("0xowner"));
        assert_eq!(business.histogram(), [0; 5]);
        assert_eq!(business.total_reviews, 0);
    }

    #[tokio::test]
    async fn create_rejects_bad_and_duplicate_slugs() {
        let (_, service) = service();
        service.create(listing("Urban Eats")).await.expect("create");

        let err = service
            .create(listing("Urban  Eats!"))
            .await
            .expect_err("duplicate slug");
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "slug"));

        let mut bad = listing("Corner Deli");
        bad.slug = Some("Corner Deli".into());
        assert!(matches!(
            service.create(bad).await,
            Err(CoreError::Validation { .. })
        ));

        assert!(matches!(
            service.create(listing("!!!")).await,
            Err(CoreError::Validation { .. })
        ));
        assert!(matches!(
            service.create(listing("   ")).await,
            Err(CoreError::Validation { ref field, .. }) if field == "name"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_claim_a_slug_once() {
        let (store, service) = service();
        let mut tasks = Vec::new();
        for _ in 0..10 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move { service.create(listing("Urban Eats")).await }));
        }
        let mut created = 0;
        for task in tasks {
            if task.await.expect("join").is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.count(BUSINESSES, None).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn by_slug_only_sees_active_listings() {
        let (store, service) = service();
        let pending = service.create(listing("Urban Eats")).await.expect("create");
        assert!(service.by_slug("urban-eats").await.expect("lookup").is_none());

        store
            .update(BUSINESSES, &pending.id, fields(json!({ "status": "active" })).expect("fields"))
            .await
            .expect("approve");
        let found = service.by_slug("urban-eats").await.expect("lookup").expect("listed");
        assert_eq!(found.id, pending.id);

        // Imported listings without a status are listed.
        store
            .create(
                BUSINESSES,
                fields(json!({ "name": "Old Mill", "slug": "old-mill" })).expect("fields"),
            )
            .await
            .expect("create");
        assert!(service.by_slug("old-mill").await.expect("lookup").is_some());
        assert!(service.by_slug("missing").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn search_matches_text_case_insensitively() {
        let (store, service) = service();
        seed(&store, "The Daily Grind", "the-daily-grind", json!({ "category": "coffee-shop" })).await;
        seed(&store, "Urban Eats", "urban-eats", json!({ "description": "Brunch and COFFEE" })).await;
        seed(&store, "Tech Solutions", "tech-solutions", json!({ "category": "services" })).await;
        seed(&store, "Coffee Corner", "coffee-corner", json!({ "status": "suspended" })).await;

        let found = service
            .search(&BusinessSearch {
                query: Some("coffee".into()),
                ..BusinessSearch::default()
            })
            .await
            .expect("search");
        let mut slugs: Vec<_> = found.iter().map(|b| b.slug.as_str()).collect();
        slugs.sort_unstable();
        assert_eq!(slugs, ["the-daily-grind", "urban-eats"]);

        let all = service.search(&BusinessSearch::default()).await.expect("search");
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn search_sorts_and_limits() {
        let (store, service) = service();
        seed(&store, "A", "a", json!({ "average_rating": 4.5, "total_reviews": 2 })).await;
        seed(&store, "B", "b", json!({ "average_rating": 3.0, "total_reviews": 9 })).await;
        seed(&store, "C", "c", json!({ "average_rating": 4.5, "total_reviews": 7 })).await;

        let by_rating = service
            .search(&BusinessSearch {
                sort: BusinessSort::Rating,
                ..BusinessSearch::default()
            })
            .await
            .expect("search");
        let slugs: Vec<_> = by_rating.iter().map(|b| b.slug.as_str()).collect();
        assert_eq!(slugs, ["c", "a", "b"]);

        let by_reviews = service
            .search(&BusinessSearch {
                sort: BusinessSort::Reviews,
                limit: 2,
                ..BusinessSearch::default()
            })
            .await
            .expect("search");
        let slugs: Vec<_> = by_reviews.iter().map(|b| b.slug.as_str()).collect();
        assert_eq!(slugs, ["b", "c"]);
    }

    #[tokio::test]
    async fn search_applies_filter_expression() {
        let (store, service) = service();
        seed(&store, "A", "a", json!({ "average_rating": 4.5, "verified": true })).await;
        seed(&store, "B", "b", json!({ "average_rating": 2.0, "verified": true })).await;
        seed(&store, "C", "c", json!({ "average_rating": 4.8 })).await;

        let found = service
            .search(&BusinessSearch {
                filter: Some("verified=true && average_rating>=4".into()),
                ..BusinessSearch::default()
            })
            .await
            .expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "a");

        let err = service
            .search(&BusinessSearch {
                filter: Some("rating >>".into()),
                ..BusinessSearch::default()
            })
            .await
            .expect_err("bad filter");
        assert!(matches!(err, CoreError::Store(trust_store::StoreError::InvalidFilter { .. })));
    }
}
