use gridplay::error::GridError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid document id {0:?}")]
    BadId(String),
    #[error("no {0} loaded")]
    NotLoaded(&'static str),
    #[error("load superseded by a newer request")]
    Superseded,
    #[error("config: {0}")]
    Config(String),
}
