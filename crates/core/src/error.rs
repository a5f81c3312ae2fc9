//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid chunk size: {size} (must be between {min} and {max})")]
    InvalidChunkSize { size: u64, min: u64, max: u64 },

    #[error("cannot plan chunks for an empty file")]
    EmptyFile,

    #[error("invalid chunk label: {0}")]
    InvalidLabel(String),

    #[error("invalid upload ID: {0}")]
    InvalidUploadId(String),

    #[error("upload session error: {0}")]
    UploadSession(String),

    #[error("{0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
