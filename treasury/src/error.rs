//! Treasury error types

use thiserror::Error;

/// Coarse error category reported back to the caller of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    NotFound,
    Expired,
    InvariantViolation,
    Collaborator,
    Config,
}

/// Treasury action errors
///
/// Every variant aborts the whole action; the service restores the state it
/// held before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreasuryError {
    #[error("Missing required authority of {actor} for action {action}")]
    Authorization { actor: String, action: String },

    #[error("{field} not found: {value}")]
    NotFound { field: &'static str, value: String },

    #[error("{field} {value} expired at {expired_at}")]
    Expired {
        field: &'static str,
        value: String,
        expired_at: u64,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Collaborator call failed: {0}")]
    Collaborator(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TreasuryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreasuryError::Authorization { .. } => ErrorKind::Authorization,
            TreasuryError::NotFound { .. } => ErrorKind::NotFound,
            TreasuryError::Expired { .. } => ErrorKind::Expired,
            TreasuryError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            TreasuryError::Collaborator(_) => ErrorKind::Collaborator,
            TreasuryError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn unauthorized(actor: &str, action: &str) -> Self {
        TreasuryError::Authorization {
            actor: actor.to_string(),
            action: action.to_string(),
        }
    }

    pub(crate) fn not_found(field: &'static str, value: &str) -> Self {
        TreasuryError::NotFound {
            field,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TreasuryError>;
