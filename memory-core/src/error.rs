use memory_cache::CacheError;
use memory_embedding::EmbeddingError;
use memory_store::StorageError;

pub type MemoryResult<T> = Result<T, MemoryError>;

/// Top-level error composing every component's failure mode. Each
/// component's own error type carries the detail; this just gives callers
/// one type to match on.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<anyhow::Error> for MemoryError {
    fn from(err: anyhow::Error) -> Self {
        MemoryError::Config(err.to_string())
    }
}
