//! Common error types for ListenLab

use thiserror::Error;

/// Common result type for ListenLab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the ListenLab crates
#[derive(Error, Debug)]
pub enum Error {
    /// Study configuration error (content pools too small for the quota
    /// tables, malformed metadata, bad service config). Fatal: the study
    /// cannot run for any participant until the configuration is fixed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resume requested for a participant id with no recorded rows.
    /// The caller must not silently mint a new identity.
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    /// Invalid user input for the current step; session state is unchanged
    /// and the participant may correct and resubmit.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transient record-store or content-store failure. Recoverable: the
    /// step that triggered it can be resubmitted without data loss.
    #[error("Store error: {0}")]
    Store(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
