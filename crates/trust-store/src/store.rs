//! The document store seam.

use crate::error::Result;
use crate::event::ChangeEvent;
use crate::filter::Filter;
use crate::record::{Fields, Record};
use std::future::Future;
use tokio::sync::broadcast;

/// Operations TrustHub needs from its document store.
///
/// Updates are patches: only the given fields change.
pub trait DocumentStore: Send + Sync + 'static {
    /// Create a record. A string `id` in `fields` is used as the record ID.
    fn create(&self, collection: &str, fields: Fields)
    -> impl Future<Output = Result<Record>> + Send;

    /// Patch a record.
    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> impl Future<Output = Result<Record>> + Send;

    /// Delete a record.
    fn delete(&self, collection: &str, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Fetch one record by ID.
    fn get(&self, collection: &str, id: &str) -> impl Future<Output = Result<Record>> + Send;

    /// All records matching `filter`, oldest first.
    fn list(
        &self,
        collection: &str,
        filter: Option<&Filter>,
    ) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Subscribe to changes in a collection.
    fn subscribe(&self, collection: &str) -> broadcast::Receiver<ChangeEvent>;

    /// Cheap round trip proving the store is reachable.
    fn health_check(&self) -> impl Future<Output = Result<()>> + Send;

    /// First record matching `filter`.
    fn first(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<Option<Record>>> + Send {
        async move {
            let records = self.list(collection, Some(filter)).await?;
            Ok(records.into_iter().next())
        }
    }

    /// Number of records matching `filter`.
    fn count(
        &self,
        collection: &str,
        filter: Option<&Filter>,
    ) -> impl Future<Output = Result<usize>> + Send {
        async move { Ok(self.list(collection, filter).await?.len()) }
    }
}
