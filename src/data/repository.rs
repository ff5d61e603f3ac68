//! Workout operations translated into document store calls.
//!
//! The repository keeps no state of its own. Every operation is scoped to the
//! user id it is given, and documents owned by anyone else behave as if they
//! did not exist.

use std::sync::Arc;

use super::models::{NewWorkout, WorkoutPatch, WorkoutRecord};
use super::store::{Document, DocumentStore, FieldFilter, StoreError, Subscription};
use crate::error::{TrackerError, TrackerResult};

/// Collection holding workout documents
pub const WORKOUTS_COLLECTION: &str = "workouts";

const OWNER_FIELD: &str = "userId";

/// Decode a snapshot, dropping anything unreadable or not owned by `user_id`
fn decode_snapshot(user_id: &str, documents: Vec<Document>) -> Vec<WorkoutRecord> {
    documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match WorkoutRecord::from_document(doc) {
                Ok(record) if record.user_id == user_id => Some(record),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(id = %id, "skipping malformed workout document: {e}");
                    None
                }
            }
        })
        .collect()
}

pub struct WorkoutRepository<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> Clone for WorkoutRepository<S> {
    fn clone(&self) -> Self {
        WorkoutRepository {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore + ?Sized> WorkoutRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        WorkoutRepository { store }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Persist a new workout owned by `user_id` and return its id
    pub fn add(&self, user_id: &str, workout: &NewWorkout) -> TrackerResult<String> {
        let mut doc = serde_json::to_value(workout)
            .map_err(|e| TrackerError::Persistence(e.to_string()))?;
        if let Some(fields) = doc.as_object_mut() {
            fields.insert(OWNER_FIELD.to_string(), user_id.into());
        }

        let id = self
            .store
            .add(WORKOUTS_COLLECTION, doc)
            .map_err(persistence)?;
        tracing::info!(id = %id, date = %workout.date, exercise = %workout.exercise, "workout added");
        Ok(id)
    }

    /// Merge `patch` into the workout `id`
    pub fn update(&self, user_id: &str, id: &str, patch: &WorkoutPatch) -> TrackerResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        if !self.is_owned_by(user_id, id)? {
            tracing::warn!(id, "update rejected: workout not found for user");
            return Err(TrackerError::NotFound(id.to_string()));
        }

        let partial = serde_json::to_value(patch)
            .map_err(|e| TrackerError::Persistence(e.to_string()))?;
        self.store.update(WORKOUTS_COLLECTION, id, partial)?;
        tracing::info!(id, "workout updated");
        Ok(())
    }

    /// Remove the workout `id`. Missing ids are not an error.
    pub fn delete(&self, user_id: &str, id: &str) -> TrackerResult<()> {
        if !self.is_owned_by(user_id, id)? {
            tracing::debug!(id, "delete skipped: workout not found for user");
            return Ok(());
        }
        self.store
            .delete(WORKOUTS_COLLECTION, id)
            .map_err(persistence)?;
        tracing::info!(id, "workout deleted");
        Ok(())
    }

    /// One-shot fetch of every workout owned by `user_id`, in creation order
    pub fn list(&self, user_id: &str) -> TrackerResult<Vec<WorkoutRecord>> {
        let docs = self
            .store
            .query(WORKOUTS_COLLECTION, &FieldFilter::eq(OWNER_FIELD, user_id))
            .map_err(persistence)?;
        Ok(decode_snapshot(user_id, docs))
    }

    /// Live query over `user_id`'s workouts.
    ///
    /// `on_snapshot` runs immediately with the current list and again with the
    /// complete list after every change.
    pub fn subscribe<F>(&self, user_id: &str, mut on_snapshot: F) -> TrackerResult<Subscription>
    where
        F: FnMut(Vec<WorkoutRecord>) + Send + 'static,
    {
        let owner = user_id.to_string();
        let subscription = self
            .store
            .subscribe(
                WORKOUTS_COLLECTION,
                FieldFilter::eq(OWNER_FIELD, user_id),
                Box::new(move |docs| on_snapshot(decode_snapshot(&owner, docs))),
            )
            .map_err(persistence)?;
        tracing::debug!(user_id, "subscribed to workouts");
        Ok(subscription)
    }

    fn is_owned_by(&self, user_id: &str, id: &str) -> TrackerResult<bool> {
        let doc = self
            .store
            .get(WORKOUTS_COLLECTION, id)
            .map_err(persistence)?;
        Ok(doc.is_some_and(|d| FieldFilter::eq(OWNER_FIELD, user_id).matches(&d.data)))
    }
}

/// Store failures outside of `update` are always persistence errors
fn persistence(err: StoreError) -> TrackerError {
    TrackerError::Persistence(err.to_string())
}
