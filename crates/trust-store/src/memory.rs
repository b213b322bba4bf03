//! In-process document store.

use crate::error::{Result, StoreError};
use crate::event::{ChangeAction, ChangeEvent};
use crate::filter::Filter;
use crate::record::{Fields, Record, SYSTEM_FIELDS};
use crate::store::DocumentStore;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use trust_persist::JsonStore;
use uuid::Uuid;

const CHANGE_CHANNEL_CAPACITY: usize = 1024;
const ID_LEN: usize = 15;

type Collections = HashMap<String, Vec<Record>>;

/// Document store held in memory, optionally snapshotted to disk.
pub struct MemoryStore {
    collections: RwLock<Collections>,
    channels: Mutex<HashMap<String, broadcast::Sender<ChangeEvent>>>,
    online: AtomicBool,
    snapshot: Option<JsonStore>,
}

impl MemoryStore {
    /// Create an empty, memory-only store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            snapshot: None,
        }
    }

    /// Open a store persisted under `state_path`, loading any snapshot.
    pub fn open(state_path: &Path) -> Self {
        let snapshot = JsonStore::new(state_path, "collections");
        let collections: Collections = snapshot.load();
        debug!(
            collections = collections.len(),
            records = collections.values().map(Vec::len).sum::<usize>(),
            "loaded document store from disk"
        );
        Self {
            collections: RwLock::new(collections),
            snapshot: Some(snapshot),
            ..Self::new()
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("document store offline"))
        }
    }

    fn sender(&self, collection: &str) -> broadcast::Sender<ChangeEvent> {
        self.channels
            .lock()
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn publish(&self, action: ChangeAction, record: &Record) {
        // Nobody listening is fine.
        let _ = self.sender(&record.collection).send(ChangeEvent {
            action,
            record: record.clone(),
        });
    }

    fn persist(&self) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        if let Err(e) = snapshot.save(&*self.collections.read()) {
            warn!(error = %e, "failed to snapshot document store");
        }
    }

    fn new_id() -> String {
        Uuid::new_v4().simple().to_string()[..ID_LEN].to_string()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, mut fields: Fields) -> Result<Record> {
        self.ensure_online()?;
        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => Self::new_id(),
        };
        for key in SYSTEM_FIELDS {
            fields.remove(key);
        }

        let now = Utc::now();
        let record = Record {
            id,
            collection: collection.to_string(),
            created: now,
            updated: now,
            fields,
        };
        {
            let mut collections = self.collections.write();
            let records = collections.entry(collection.to_string()).or_default();
            if records.iter().any(|r| r.id == record.id) {
                return Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    id: record.id,
                });
            }
            records.push(record.clone());
        }

        debug!(collection, id = %record.id, "record created");
        self.persist();
        self.publish(ChangeAction::Create, &record);
        Ok(record)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<Record> {
        self.ensure_online()?;
        let record = {
            let mut collections = self.collections.write();
            let record = collections
                .get_mut(collection)
                .and_then(|records| records.iter_mut().find(|r| r.id == id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            for (key, value) in patch {
                if !SYSTEM_FIELDS.contains(&key.as_str()) {
                    record.fields.insert(key, value);
                }
            }
            record.updated = Utc::now();
            record.clone()
        };

        self.persist();
        self.publish(ChangeAction::Update, &record);
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.ensure_online()?;
        let removed = {
            let mut collections = self.collections.write();
            let records = collections
                .get_mut(collection)
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            let index = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            records.remove(index)
        };

        debug!(collection, id, "record deleted");
        self.persist();
        self.publish(ChangeAction::Delete, &removed);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Record> {
        self.ensure_online()?;
        self.collections
            .read()
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn list(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Record>> {
        self.ensure_online()?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.is_none_or(|f| f.matches(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<ChangeEvent> {
        self.sender(collection).subscribe()
    }

    async fn health_check(&self) -> Result<()> {
        self.ensure_online()
    }
}
