//! Error types for jotter.

use thiserror::Error;

/// Result type alias using jotter's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for jotter operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found (attachment reference, route entity)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Requested state transition conflicts with the current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input (bad sort key, malformed body, oversized upload)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded bytes are not a decodable image
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    /// Attachment storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the variants that mean "the thing you asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::NoteNotFound(_))
    }
}
