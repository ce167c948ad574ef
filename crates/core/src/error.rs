//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("chunk index {index} out of range for {total} declared chunks")]
    ChunkIndexOutOfRange { index: u32, total: u32 },

    #[error("invalid chunk count: {0}")]
    InvalidChunkCount(u32),

    #[error("empty chunk payload")]
    EmptyChunk,

    #[error("chunk size {size} exceeds maximum {max}")]
    ChunkTooLarge { size: u64, max: u64 },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
