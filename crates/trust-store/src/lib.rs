//! # trust-store
//!
//! The document store TrustHub keeps its `users`, `businesses`, `reviews`,
//! `categories` and `analytics` collections in.
//!
//! The store is an external collaborator reached through [`DocumentStore`]:
//! create/update/delete, filtered listing, and a per-collection change feed.
//! [`MemoryStore`] is the bundled backend, optionally snapshotted to disk.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use trust_store::{DocumentStore, Filter, MemoryStore, fields};
//!
//! # async fn example() -> trust_store::Result<()> {
//! let store = MemoryStore::new();
//! store
//!     .create("reviews", fields(json!({ "business_id": "b1", "rating": 5, "status": "published" }))?)
//!     .await?;
//!
//! let filter = Filter::parse(r#"business_id="b1" && status="published""#)?;
//! let published = store.list("reviews", Some(&filter)).await?;
//! assert_eq!(published.len(), 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod filter;
pub mod memory;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use event::{ChangeAction, ChangeEvent};
pub use filter::{CompareOp, Filter};
pub use memory::MemoryStore;
pub use record::{Fields, Record, fields};
pub use store::DocumentStore;

/// Collection names.
pub mod collections {
    /// Platform users, keyed by wallet address.
    pub const USERS: &str = "users";
    /// Reviewed businesses.
    pub const BUSINESSES: &str = "businesses";
    /// Reviews.
    pub const REVIEWS: &str = "reviews";
    /// Business categories.
    pub const CATEGORIES: &str = "categories";
    /// Analytics events.
    pub const ANALYTICS: &str = "analytics";
    /// One record per (review, voter) pair.
    pub const REVIEW_VOTES: &str = "review_votes";
}
