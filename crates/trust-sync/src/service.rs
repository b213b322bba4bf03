//! The reconciliation service.
//!
//! Listens to the ledger's event stream and to store change feeds, turns
//! ledger facts into queued [`SyncOperation`]s and applies them one per tick.
//! Store changes to reviews trigger rollup recomputes directly.

use crate::apply::apply;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::operation::{Priority, QueuedOperation, SyncKind, SyncOperation};
use crate::queue::SyncQueue;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use trust_core::{AnalyticsEvent, BusinessRecord, ReviewRecord, StatsAggregator, record_event};
use trust_store::collections::{BUSINESSES, REVIEWS, USERS};
use trust_store::{ChangeAction, ChangeEvent, DocumentStore, Filter, Record};
use trust_token::{LedgerClient, LedgerEvent, WalletAddress};

/// Collections whose change feeds the service follows.
pub const WATCHED_COLLECTIONS: [&str; 3] = [REVIEWS, BUSINESSES, USERS];

const NOTIFICATION_CAPACITY: usize = 256;

/// Outbound notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncNotification {
    /// A business became verified.
    BusinessVerified {
        /// Business ID.
        business_id: String,
        /// Business name.
        name: String,
    },
    /// A record in a watched collection was created, updated or deleted.
    RecordChanged {
        /// Collection name.
        collection: String,
        /// What happened.
        action: ChangeAction,
        /// Record ID.
        id: String,
    },
    /// An operation failed and was discarded.
    OperationDropped {
        /// Queue sequence number.
        id: u64,
        /// Operation type.
        kind: SyncKind,
        /// Failure.
        error: String,
    },
}

/// Result of processing one queued operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// The corrective write went through.
    Applied {
        /// Queue sequence number.
        id: u64,
        /// Operation type.
        kind: SyncKind,
        /// Records written; zero when already reconciled.
        written: usize,
    },
    /// The operation failed and was discarded without retry.
    Dropped {
        /// Queue sequence number.
        id: u64,
        /// Operation type.
        kind: SyncKind,
        /// Failure.
        error: String,
    },
}

/// Point-in-time service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// `start` was called and `stop` was not.
    pub running: bool,
    /// Operations waiting.
    pub queue_size: usize,
    /// An operation is being applied right now.
    pub processing: bool,
    /// Live event subscriptions.
    pub subscriptions: usize,
}

/// Reconciles derived store fields with the ledger.
pub struct ReconciliationService<S, L> {
    inner: Arc<Inner<S, L>>,
}

impl<S, L> Clone for ReconciliationService<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    stats: StatsAggregator<S>,
    config: SyncConfig,
    queue: Mutex<SyncQueue>,
    processing: tokio::sync::Mutex<()>,
    running: AtomicBool,
    ticker: Mutex<Option<JoinHandle<()>>>,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
    notifications: broadcast::Sender<SyncNotification>,
    verified_businesses: Mutex<HashSet<String>>,
}

impl<S: DocumentStore, L: LedgerClient> ReconciliationService<S, L> {
    /// Create a stopped service.
    pub fn new(store: Arc<S>, ledger: Arc<L>, config: SyncConfig) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                stats: StatsAggregator::new(Arc::clone(&store)),
                store,
                ledger,
                config,
                queue: Mutex::new(SyncQueue::new()),
                processing: tokio::sync::Mutex::new(()),
                running: AtomicBool::new(false),
                ticker: Mutex::new(None),
                subscriptions: Mutex::new(Vec::new()),
                notifications,
                verified_businesses: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Subscribe to the ledger and the watched collections and start the
    /// queue timer.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] if the service is running.
    pub async fn start(&self) -> Result<()> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(SyncError::AlreadyRunning);
        }
        self.inner.seed_verified_businesses().await;

        // Receivers are taken before spawning so no event after `start`
        // returns is missed.
        let mut handles = Vec::with_capacity(WATCHED_COLLECTIONS.len() + 1);
        let ledger_rx = self.inner.ledger.subscribe();
        handles.push(tokio::spawn(Inner::follow_ledger(
            Arc::clone(&self.inner),
            ledger_rx,
        )));
        for collection in WATCHED_COLLECTIONS {
            let rx = self.inner.store.subscribe(collection);
            handles.push(tokio::spawn(Inner::follow_collection(
                Arc::clone(&self.inner),
                collection,
                rx,
            )));
        }
        *self.inner.subscriptions.lock() = handles;

        let inner = Arc::clone(&self.inner);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                inner.process_next().await;
            }
        });
        *self.inner.ticker.lock() = Some(ticker);

        info!(
            tick_ms = self.inner.config.tick_interval.as_millis() as u64,
            collections = WATCHED_COLLECTIONS.len(),
            "reconciliation service started"
        );
        Ok(())
    }

    /// Cancel the timer and every subscription and drop queued operations.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(ticker) = self.inner.ticker.lock().take() {
            ticker.abort();
        }
        for handle in self.inner.subscriptions.lock().drain(..) {
            handle.abort();
        }
        let dropped = {
            let mut queue = self.inner.queue.lock();
            let len = queue.len();
            queue.clear();
            len
        };
        info!(dropped, "reconciliation service stopped");
    }

    /// Queue an operation. Returns its sequence number.
    pub fn enqueue(&self, operation: SyncOperation, priority: Priority) -> u64 {
        self.inner.enqueue(operation, priority)
    }

    /// Translate a ledger event into queued operations.
    pub fn handle_ledger_event(&self, event: &LedgerEvent) {
        self.inner.on_ledger_event(event);
    }

    /// React to a store change. Used by the subscriptions; errors are
    /// returned here and logged there.
    pub async fn handle_change(&self, collection: &str, event: &ChangeEvent) -> Result<()> {
        self.inner.on_change(collection, event).await
    }

    /// Apply the head of the queue.
    ///
    /// Returns `None` when the queue is empty or another operation is being
    /// applied.
    pub async fn process_next(&self) -> Option<Processed> {
        self.inner.process_next().await
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            running: self.inner.running.load(Ordering::SeqCst),
            queue_size: self.inner.queue.lock().len(),
            processing: self.inner.processing.try_lock().is_err(),
            subscriptions: self.inner.subscriptions.lock().len(),
        }
    }

    /// Waiting operations in dequeue order.
    pub fn queued_operations(&self) -> Vec<QueuedOperation> {
        self.inner.queue.lock().snapshot()
    }

    /// Subscribe to outbound notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotification> {
        self.inner.notifications.subscribe()
    }
}

impl<S: DocumentStore, L: LedgerClient> Inner<S, L> {
    fn enqueue(&self, operation: SyncOperation, priority: Priority) -> u64 {
        let kind = operation.kind();
        let (id, depth) = {
            let mut queue = self.queue.lock();
            let id = queue.push(operation, priority);
            (id, queue.len())
        };
        debug!(id, kind = %kind, priority = %priority, depth, "operation queued");
        id
    }

    async fn process_next(&self) -> Option<Processed> {
        let Ok(_guard) = self.processing.try_lock() else {
            debug!("operation in flight, skipping tick");
            return None;
        };
        let queued = self.queue.lock().pop()?;
        let kind = queued.operation.kind();

        match apply(self.store.as_ref(), self.ledger.as_ref(), &queued.operation).await {
            Ok(written) => {
                debug!(id = queued.id, kind = %kind, written, "operation applied");
                Some(Processed::Applied {
                    id: queued.id,
                    kind,
                    written,
                })
            }
            Err(e) => {
                warn!(id = queued.id, kind = %kind, error = %e, "dropping reconciliation operation");
                let error = e.to_string();
                self.notify(SyncNotification::OperationDropped {
                    id: queued.id,
                    kind,
                    error: error.clone(),
                });
                Some(Processed::Dropped {
                    id: queued.id,
                    kind,
                    error,
                })
            }
        }
    }

    fn on_ledger_event(&self, event: &LedgerEvent) {
        let priorities = self.config.priorities;
        match event {
            LedgerEvent::ReviewSubmitted {
                review_id,
                content_hash,
                tx_hash,
                ..
            } => {
                self.enqueue(
                    SyncOperation::ReviewBlockchainConfirmed {
                        blockchain_id: review_id.clone(),
                        tx_hash: tx_hash.clone(),
                        content_hash: content_hash.clone(),
                        confirmed_at: Utc::now(),
                    },
                    priorities.review_submitted,
                );
            }
            LedgerEvent::ReviewVerified {
                review_id,
                verifier,
                verified_at,
            } => {
                self.enqueue(
                    SyncOperation::ReviewVerified {
                        blockchain_id: review_id.clone(),
                        verifier: verifier.clone(),
                        verified_at: *verified_at,
                    },
                    priorities.review_verified,
                );
            }
            LedgerEvent::TokenMint { to, .. } => {
                self.enqueue_balance(to, priorities.token_mint);
            }
            LedgerEvent::TokenTransfer { from, to, .. } => {
                for party in [from, to] {
                    if !party.is_burn() {
                        self.enqueue_balance(party, priorities.token_transfer);
                    }
                }
            }
        }
    }

    fn enqueue_balance(&self, wallet: &WalletAddress, priority: Priority) {
        self.enqueue(
            SyncOperation::UpdateUserBalance {
                wallet: wallet.clone(),
            },
            priority,
        );
    }

    async fn on_change(&self, collection: &str, event: &ChangeEvent) -> Result<()> {
        if WATCHED_COLLECTIONS.contains(&collection) {
            self.notify(SyncNotification::RecordChanged {
                collection: collection.to_string(),
                action: event.action,
                id: event.record.id.clone(),
            });
        }
        match collection {
            REVIEWS => self.on_review_change(event).await,
            BUSINESSES => self.on_business_change(event).await,
            USERS => {
                if event.action == ChangeAction::Create {
                    let mut analytics = AnalyticsEvent::new("user_registered");
                    analytics.user_address = event.record.str_field("wallet_address").map(String::from);
                    record_event(self.store.as_ref(), analytics).await;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn on_review_change(&self, event: &ChangeEvent) -> Result<()> {
        let review: ReviewRecord = typed(&event.record)?;
        self.stats.recompute_business(&review.business_id).await?;
        self.stats.recompute_user(&review.reviewer_address).await?;

        if event.action == ChangeAction::Create {
            let mut analytics = AnalyticsEvent::new("review_created");
            analytics.user_address = Some(review.reviewer_address.to_string());
            analytics.business_id = Some(review.business_id.clone());
            analytics.review_id = Some(review.id.clone());
            analytics.metadata = json!({
                "rating": review.rating,
                "verified": review.world_id_verified,
            });
            record_event(self.store.as_ref(), analytics).await;
        }
        Ok(())
    }

    async fn on_business_change(&self, event: &ChangeEvent) -> Result<()> {
        let business: BusinessRecord = typed(&event.record)?;

        let newly_verified = {
            let mut verified = self.verified_businesses.lock();
            match event.action {
                ChangeAction::Delete => {
                    verified.remove(&business.id);
                    false
                }
                _ if business.verified => verified.insert(business.id.clone()),
                _ => {
                    verified.remove(&business.id);
                    false
                }
            }
        };
        if newly_verified {
            info!(business_id = %business.id, name = %business.name, "business verified");
            self.notify(SyncNotification::BusinessVerified {
                business_id: business.id.clone(),
                name: business.name.clone(),
            });
        }

        if event.action == ChangeAction::Create {
            let mut analytics = AnalyticsEvent::new("business_created");
            analytics.business_id = Some(business.id.clone());
            analytics.user_address = business.owner_wallet.clone();
            analytics.metadata = json!({ "name": business.name, "category": business.category });
            record_event(self.store.as_ref(), analytics).await;
        }
        Ok(())
    }

    async fn seed_verified_businesses(&self) {
        match self
            .store
            .list(BUSINESSES, Some(&Filter::eq("verified", true)))
            .await
        {
            Ok(records) => {
                let mut verified = self.verified_businesses.lock();
                verified.clear();
                verified.extend(records.into_iter().map(|r| r.id));
            }
            Err(e) => warn!(error = %e, "could not load verified businesses"),
        }
    }

    fn notify(&self, notification: SyncNotification) {
        // No subscribers is fine.
        let _ = self.notifications.send(notification);
    }

    async fn follow_ledger(self: Arc<Self>, mut rx: broadcast::Receiver<LedgerEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.on_ledger_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "ledger event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("ledger subscription closed");
    }

    async fn follow_collection(
        self: Arc<Self>,
        collection: &'static str,
        mut rx: broadcast::Receiver<ChangeEvent>,
    ) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.on_change(collection, &event).await {
                        warn!(
                            collection,
                            id = %event.record.id,
                            action = %event.action,
                            error = %e,
                            "change handler failed"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(collection, skipped, "change feed lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(collection, "change subscription closed");
    }
}

fn typed<T: serde::de::DeserializeOwned>(record: &Record) -> Result<T> {
    record.decode().map_err(|e| SyncError::InvalidRecord {
        collection: record.collection.clone(),
        id: record.id.clone(),
        message: e.to_string(),
    })
}
