//! Shared state for the API server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use trust_core::{
    BusinessService, IdentityCache, ReviewRecord, ReviewService, ReviewStatus, UserDirectory, decode,
};
use trust_store::collections::REVIEWS;
use trust_store::{DocumentStore, Filter, MemoryStore};
use trust_sync::{HealthMonitor, ReconciliationService};
use trust_token::{SimulatedLedger, TokenLedger};

use crate::config::ServerConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::identity::ProofVerifier;
use crate::session::SessionIssuer;
use crate::types::BusinessView;

/// Everything the request handlers share.
pub struct AppState<V> {
    config: ServerConfig,
    store: Arc<MemoryStore>,
    ledger: Arc<TokenLedger<SimulatedLedger>>,
    identity: Arc<IdentityCache>,
    users: UserDirectory<MemoryStore>,
    businesses: BusinessService<MemoryStore>,
    reviews: ReviewService<MemoryStore, SimulatedLedger>,
    sync: ReconciliationService<MemoryStore, SimulatedLedger>,
    health: HealthMonitor<MemoryStore>,
    sessions: SessionIssuer,
    verifier: V,
    business_cache: Mutex<HashMap<String, BusinessView>>,
    start_time: Instant,
}

impl<V: ProofVerifier> AppState<V> {
    /// Build the services described by `config`.
    ///
    /// State is persisted under `server.data_dir` when it is set and kept in
    /// memory otherwise.
    pub fn new(config: ServerConfig, verifier: V) -> Self {
        let ledger_config = config.ledger.to_config();
        let (client, store, ledger, identity) = match &config.server.data_dir {
            Some(dir) => {
                info!(data_dir = %dir.display(), "opening persisted state");
                let client = Arc::new(SimulatedLedger::open(dir));
                (
                    Arc::clone(&client),
                    MemoryStore::open(dir),
                    TokenLedger::open(client, ledger_config, dir),
                    IdentityCache::open(dir),
                )
            }
            None => {
                let client = Arc::new(SimulatedLedger::new());
                (
                    Arc::clone(&client),
                    MemoryStore::new(),
                    TokenLedger::new(client, ledger_config),
                    IdentityCache::new(),
                )
            }
        };
        let store = Arc::new(store);
        let ledger = Arc::new(ledger);
        let identity = Arc::new(identity);

        let reviews = ReviewService::new(Arc::clone(&store), Arc::clone(&ledger), Arc::clone(&identity))
            .with_schedule(config.rewards.clone());
        let sync = ReconciliationService::new(Arc::clone(&store), client, config.sync.to_config());
        let health = HealthMonitor::new(Arc::clone(&store), config.health.to_config());

        Self {
            users: UserDirectory::new(Arc::clone(&store)),
            businesses: BusinessService::new(Arc::clone(&store)),
            sessions: SessionIssuer::new(&config.session),
            config,
            store,
            ledger,
            identity,
            reviews,
            sync,
            health,
            verifier,
            business_cache: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Document store.
    #[must_use]
    pub const fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Token balance store.
    #[must_use]
    pub const fn ledger(&self) -> &Arc<TokenLedger<SimulatedLedger>> {
        &self.ledger
    }

    /// Identity verification cache.
    #[must_use]
    pub const fn identity(&self) -> &Arc<IdentityCache> {
        &self.identity
    }

    /// User directory.
    #[must_use]
    pub const fn users(&self) -> &UserDirectory<MemoryStore> {
        &self.users
    }

    /// Business listings.
    #[must_use]
    pub const fn businesses(&self) -> &BusinessService<MemoryStore> {
        &self.businesses
    }

    /// Review service.
    #[must_use]
    pub const fn reviews(&self) -> &ReviewService<MemoryStore, SimulatedLedger> {
        &self.reviews
    }

    /// Reconciliation service.
    #[must_use]
    pub const fn sync(&self) -> &ReconciliationService<MemoryStore, SimulatedLedger> {
        &self.sync
    }

    /// Store health monitor.
    #[must_use]
    pub const fn health(&self) -> &HealthMonitor<MemoryStore> {
        &self.health
    }

    /// Session token issuer.
    #[must_use]
    pub const fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Identity proof verifier.
    #[must_use]
    pub const fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Seconds since the state was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// An active business by slug with its published reviews.
    ///
    /// Every successful load is cached. While the store is unavailable the
    /// last cached view is served with `stale` set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown slug, or
    /// [`GatewayError::Unavailable`] when the store is down and nothing is
    /// cached.
    pub async fn business_view(&self, slug: &str) -> GatewayResult<BusinessView> {
        match self.load_business(slug).await {
            Ok(view) => {
                self.business_cache
                    .lock()
                    .insert(slug.to_string(), view.clone());
                Ok(view)
            }
            Err(GatewayError::Unavailable { message }) => {
                let cached = self.business_cache.lock().get(slug).cloned();
                match cached {
                    Some(mut view) => {
                        warn!(slug, error = %message, "store unavailable, serving cached business");
                        view.stale = true;
                        Ok(view)
                    }
                    None => Err(GatewayError::Unavailable { message }),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load_business(&self, slug: &str) -> GatewayResult<BusinessView> {
        let business = self
            .businesses
            .by_slug(slug)
            .await?
            .ok_or_else(|| GatewayError::not_found("business", slug))?;

        let filter = Filter::eq("business_id", business.id.as_str())
            .and(Filter::eq("status", ReviewStatus::Published.as_str()));
        let reviews = self
            .store
            .list(REVIEWS, Some(&filter))
            .await?
            .iter()
            .map(decode::<ReviewRecord>)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(slug, reviews = reviews.len(), "business loaded");

        Ok(BusinessView {
            business,
            reviews,
            stale: false,
        })
    }
}
