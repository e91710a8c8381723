//! Error types for Engram

use thiserror::Error;

/// Main error type for Engram operations
///
/// The scoring hot path never returns these: degenerate similarity is 0,
/// unknown owners are empty stores, bad weights are clamped. Errors surface
/// only at the persistence, config, and embedder boundaries.
#[derive(Error, Debug)]
pub enum EngramError {
    /// Embedding length differs from the index dimension on a write
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedder failed or returned nothing
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Snapshot load/save errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Engram operations
pub type Result<T> = std::result::Result<T, EngramError>;
