//! Error kinds shared by every tier of the roster

use thiserror::Error;

/// Failures a roster operation can report to its caller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RosterError {
    /// Rank options empty or outside the vocabulary, missing field, bad image
    #[error("Validation error: {0}")]
    Validation(String),
    /// Id collision on insert
    #[error("Champion already exists: {0}")]
    DuplicateId(String),
    /// Update or lookup of an absent id
    #[error("Champion not found: {0}")]
    NotFound(String),
    /// Network failure reaching the durable store
    #[error("Transport error: {0}")]
    Transport(String),
    /// Write attempted without a valid token
    #[error("Unauthorized")]
    Unauthorized,
}

impl RosterError {
    /// Machine-readable code used in gateway error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            RosterError::Validation(_) => "VALIDATION_ERROR",
            RosterError::DuplicateId(_) => "DUPLICATE_ID",
            RosterError::NotFound(_) => "NOT_FOUND",
            RosterError::Transport(_) => "TRANSPORT_ERROR",
            RosterError::Unauthorized => "UNAUTHORIZED",
        }
    }

    /// The message without the kind prefix
    pub fn detail(&self) -> String {
        match self {
            RosterError::Validation(msg)
            | RosterError::DuplicateId(msg)
            | RosterError::NotFound(msg)
            | RosterError::Transport(msg) => msg.clone(),
            RosterError::Unauthorized => "Authentication required".to_string(),
        }
    }

    /// Rebuild an error from a gateway envelope. Unknown codes become transport errors.
    pub fn from_code(code: &str, detail: String) -> Self {
        match code {
            "VALIDATION_ERROR" => RosterError::Validation(detail),
            "DUPLICATE_ID" => RosterError::DuplicateId(detail),
            "NOT_FOUND" => RosterError::NotFound(detail),
            "UNAUTHORIZED" => RosterError::Unauthorized,
            _ => RosterError::Transport(detail),
        }
    }

    /// Transport failures are the only recoverable kind
    pub fn is_transport(&self) -> bool {
        matches!(self, RosterError::Transport(_))
    }
}

/// Result alias for roster operations
pub type Result<T> = std::result::Result<T, RosterError>;
