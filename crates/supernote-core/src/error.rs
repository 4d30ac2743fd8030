//! Error types for supernote.

use thiserror::Error;

/// Result type alias using supernote's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for supernote operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Metadata (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A write collided with an existing note (unique constraint)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation exceeded its deadline and was abandoned
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Operation was cancelled before the store answered
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the "no such row" outcomes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoteNotFound(_))
    }

    /// True for deadline and cancellation outcomes.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Cancelled(_))
    }

    /// True when the store rejected a write because of a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Conflict(_) => true,
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
