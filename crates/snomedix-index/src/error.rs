//! Error types for index building and lookup.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Row mismatch: {vectors} vectors for {entries} surface forms")]
    RowMismatch { vectors: usize, entries: usize },

    #[error("Encoding failed: {0}")]
    Encode(#[from] snomedix_embed::EmbedError),

    #[error("Embedding cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for IndexError {
    fn from(e: bincode::Error) -> Self {
        IndexError::Cache(e.to_string())
    }
}
