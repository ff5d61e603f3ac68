//! Test-only store wrapper that can be told to fail writes.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use super::storage::{Database, SqliteStore};
use super::store::{Document, DocumentStore, FieldFilter, SnapshotCallback, StoreError, Subscription};

pub struct FlakyStore {
    inner: SqliteStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        FlakyStore {
            inner: SqliteStore::new(db).expect("store"),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("network unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DocumentStore for FlakyStore {
    fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        self.check()?;
        self.inner.add(collection, data)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id)
    }

    fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update(collection, id, partial)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(collection, id)
    }

    fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, filter)
    }

    fn subscribe(
        &self,
        collection: &str,
        filter: FieldFilter,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        self.inner.subscribe(collection, filter, callback)
    }
}
