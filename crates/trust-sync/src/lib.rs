//! # trust-sync
//!
//! Eventual consistency between the document store and the ledger.
//!
//! The ledger is authoritative for balances and review anchoring; the store
//! holds denormalized copies. [`ReconciliationService`] observes both sides
//! and applies idempotent corrective writes from a priority queue, one per
//! tick. Failed operations are logged and dropped; every handler recomputes
//! from authoritative state, so a later event heals what an earlier one
//! missed.
//!
//! [`HealthMonitor`] tracks the store connection with a heartbeat and a
//! capped reconnect policy.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trust_store::MemoryStore;
//! use trust_sync::{ReconciliationService, SyncConfig};
//! use trust_token::SimulatedLedger;
//!
//! # async fn example() -> trust_sync::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let ledger = Arc::new(SimulatedLedger::new());
//! let sync = ReconciliationService::new(store, ledger, SyncConfig::default());
//! sync.start().await?;
//! println!("{:?}", sync.status());
//! sync.stop();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod apply;
pub mod config;
pub mod error;
pub mod health;
pub mod operation;
pub mod queue;
pub mod service;

pub use apply::apply;
pub use config::{EventPriorities, HealthConfig, SyncConfig};
pub use error::{Result, SyncError};
pub use health::{ConnectionStatus, HealthMonitor};
pub use operation::{Priority, QueuedOperation, SyncKind, SyncOperation};
pub use queue::SyncQueue;
pub use service::{Processed, ReconciliationService, SyncNotification, SyncStatus, WATCHED_COLLECTIONS};
