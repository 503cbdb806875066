//! Error types for roster_client

use roster_common::RosterError;
use thiserror::Error;

/// Unified error type for cache and sync operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Domain failure, reported before anything was changed
    #[error(transparent)]
    Roster(#[from] RosterError),
    /// The local change was kept but the server did not confirm it
    #[error("Champion {id} saved locally but not synced: {source}")]
    NotSynced {
        id: String,
        #[source]
        source: RosterError,
    },
    /// Cache storage medium failed (fatal)
    #[error("Cache storage error: {0}")]
    Storage(#[from] std::io::Error),
    /// Persisted cache blob could not be understood (fatal)
    #[error("Cache blob is corrupt: {0}")]
    Corrupt(String),
}

impl ClientError {
    /// Whether the caller may retry the sync later
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::Roster(e) => e.is_transport(),
            ClientError::NotSynced { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Corrupt(err.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
