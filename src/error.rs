//! Error kinds surfaced to the view layer.
//!
//! Store and identity failures are converted into [`TrackerError`] at the
//! repository boundary, so nothing above it ever sees a raw SQLite or JSON
//! error.

use thiserror::Error;

use crate::data::StoreError;

/// Failure of a single user-level operation. None of these are fatal.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Malformed or missing input; the operation was not attempted.
    #[error("{0}")]
    Validation(String),

    /// Rejected by the identity provider (bad credentials, duplicate account).
    #[error("{0}")]
    Auth(String),

    /// Store or I/O failure while persisting a change.
    #[error("could not save changes: {0}")]
    Persistence(String),

    /// The targeted workout no longer exists.
    #[error("workout {0} no longer exists")]
    NotFound(String),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        TrackerError::Auth(message.into())
    }

    /// Short label for the status bar
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::Validation(_) => "Invalid input",
            TrackerError::Auth(_) => "Authentication failed",
            TrackerError::Persistence(_) => "Save failed",
            TrackerError::NotFound(_) => "Not found",
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingDocument { id, .. } => TrackerError::NotFound(id),
            other => TrackerError::Persistence(other.to_string()),
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
