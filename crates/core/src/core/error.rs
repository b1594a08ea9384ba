//! Error taxonomy shared by the environment, replay and loaders.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    /// Malformed step input. Never produced by well-behaved UI drivers.
    #[error("invalid direction: {0:?}")]
    InvalidDirection(String),

    /// Structurally malformed map, rule set or path from an external source.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The session already terminated (goal or truncation).
    #[error("session ended")]
    SessionEnded,

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GridError::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
