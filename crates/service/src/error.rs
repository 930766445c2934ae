//! Error types for the service layer.

use guest_engine::EngineError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// The guest request breaks the request contract
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The engine could not be built
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Scoring took longer than the configured budget
    #[error("Recommendation timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking scoring task panicked or was cancelled
    #[error("Recommendation task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ServiceError>;
