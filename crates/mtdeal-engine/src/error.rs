//! Error types for the dispatch engine.

use thiserror::Error;

/// Engine error types.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
