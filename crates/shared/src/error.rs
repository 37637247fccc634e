//! Error taxonomy for the helpdesk platform

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelpdeskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied")]
    Forbidden,

    /// Lost race or state already taken (e.g. two agents claiming one
    /// waiting session); distinct from Lifecycle so callers can tell
    /// "someone else got there first" apart from an illegal transition.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Lifecycle violation: {0}")]
    Lifecycle(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HelpdeskError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id} not found"))
    }
}

pub type HelpdeskResult<T> = Result<T, HelpdeskError>;
