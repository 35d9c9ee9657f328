//! Error types for argus-core

use thiserror::Error;

/// Result type alias for argus-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for core vocabulary operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Subject failed validation
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),
}
