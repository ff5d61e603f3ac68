//! Document store interface.
//!
//! A collection-style store: JSON documents keyed by opaque string ids,
//! per-document writes, equality queries and live subscriptions that always
//! deliver the complete matching set (never deltas).

use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: its id plus the JSON object body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

/// Equality predicate on one top-level string field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        FieldFilter {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        data.get(&self.field)
            .and_then(Value::as_str)
            .map(|v| v == self.value)
            .unwrap_or(false)
    }
}

/// Callback receiving the full current snapshot of a live query
pub type SnapshotCallback = Box<dyn FnMut(Vec<Document>) + Send>;

/// Errors raised by a [`DocumentStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document {collection}/{id} does not exist")]
    MissingDocument { collection: String, id: String },

    #[error("document body must be a JSON object")]
    NotAnObject,

    #[error("store lock poisoned")]
    Poisoned,

    /// Injected by the test store to simulate an unreachable backend
    #[cfg(test)]
    #[error("{0}")]
    Unavailable(String),
}

/// Handle for a live query. Releasing it removes the listener.
///
/// `unsubscribe` consumes the handle so it can only run once; a handle that
/// is dropped without calling it is released on drop.
#[must_use = "dropping a Subscription immediately cancels it"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            release: Some(Box::new(release)),
        }
    }

    /// Stop receiving snapshots
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Collection-style document store
pub trait DocumentStore {
    /// Insert a new document and return its store-assigned id
    fn add(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Fetch one document by id
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge top-level fields into an existing document.
    /// Fails with [`StoreError::MissingDocument`] when the id does not exist.
    fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError>;

    /// Remove a document. Deleting a missing id is not an error.
    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// One-shot query, documents in creation order
    fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<Document>, StoreError>;

    /// Register a live query. The callback runs immediately with the current
    /// snapshot and again after every change to the collection.
    ///
    /// Callbacks run on the writer's thread while the store holds its
    /// listener lock, so they must not call back into the store.
    fn subscribe(
        &self,
        collection: &str,
        filter: FieldFilter,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError>;

    /// Check for changes made through other connections and re-deliver
    /// snapshots if any were found. Returns whether anything changed.
    fn poll_remote_changes(&self) -> Result<bool, StoreError> {
        Ok(false)
    }
}
