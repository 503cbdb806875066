//! Error types for roster_server

use roster_common::RosterError;
use thiserror::Error;

/// Unified error type for store and gateway operations
#[derive(Debug, Error)]
pub enum ServerError {
    /// Domain failure (validation, duplicate id, missing record, auth)
    #[error(transparent)]
    Roster(#[from] RosterError),
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Failed to (de)serialize a stored JSON column
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A stored row holds a value the model cannot represent
    #[error("Corrupt row {id}: {reason}")]
    CorruptRow { id: String, reason: String },
    /// Request body exceeded the configured limit
    #[error("Request body too large")]
    PayloadTooLarge,
    /// Another request panicked while holding the connection
    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl ServerError {
    /// The domain error, if this is one
    pub fn roster(&self) -> Option<&RosterError> {
        match self {
            ServerError::Roster(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias for roster_server operations
pub type Result<T> = std::result::Result<T, ServerError>;
