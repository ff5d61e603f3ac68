//! Data layer: workout models, the document store, identity and the
//! workout repository on top of them.

mod aggregate;
mod identity;
mod models;
mod repository;
mod storage;
mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::aggregate;
pub use identity::{IdentityProvider, SqliteIdentity};
pub use models::{
    parse_count, parse_date, parse_exercise, AggregatedPoint, Column, NewWorkout, User,
    ValueType, WorkoutPatch, WorkoutRecord, DATE_FORMAT,
};
pub use repository::WorkoutRepository;
pub use storage::{Database, SqliteStore};
pub use store::{DocumentStore, StoreError, Subscription};
