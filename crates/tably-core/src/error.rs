//! Error types for Tably

use thiserror::Error;

/// Core error type for engine and backing-store operations
#[derive(Error, Debug)]
pub enum TablyError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Tably operations
pub type Result<T> = std::result::Result<T, TablyError>;
