//! Pool crate error types.

use thiserror::Error;

pub type PoolResult<T> = Result<T, PoolError>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("checkpoint persist failed: {0}")]
    CheckpointPersist(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PoolError {
    pub fn checkpoint_persist(msg: impl Into<String>) -> Self {
        Self::CheckpointPersist(msg.into())
    }
}
