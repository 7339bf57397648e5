//! Error types for tudu.
//!
//! Domain errors carry enough context to be shown directly to the user.
//! The CLI exits non-zero on any of these; the TUI reports recoverable
//! ones (not-found, validation, per-record decryption failures) in the
//! status bar and keeps running.

use thiserror::Error;

/// Result type alias for tudu operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The key file or salt file is missing structure, corrupted, or its
    /// permissions cannot be verified. Fatal: the key cannot be
    /// reconstructed, so the encrypted database is unreadable without it.
    #[error("failed to load encryption key: {0}")]
    KeyLoad(String),

    /// A stored record failed authentication on decrypt — the ciphertext
    /// was altered or the key is wrong. Fatal for the affected record
    /// only; other records remain readable.
    #[error("record {id} could not be decrypted (tampered data or wrong key)")]
    Decryption { id: String },

    #[error("project '{0}' not found")]
    ProjectNotFound(String),

    #[error("task '{0}' not found")]
    TaskNotFound(String),

    /// Rejected before any storage call (empty title, negative story
    /// points, duplicate project name).
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the TUI can recover from this error by showing a message
    /// and carrying on, rather than tearing down the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Decryption { .. }
                | Error::ProjectNotFound(_)
                | Error::TaskNotFound(_)
                | Error::Validation(_)
        )
    }
}
