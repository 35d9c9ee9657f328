//! Error types for engine operations

use thiserror::Error;

/// Engine-specific errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistent store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// `retry` was asked for a subject that never ran
    #[error("No prior run for subject: {0}")]
    UnknownSubject(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
