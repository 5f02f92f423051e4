#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("corrupt embedding for memory {memory_id} sector {sector}: {reason}")]
    CorruptEmbedding {
        memory_id: String,
        sector: String,
        reason: String,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("cursor decode error: {0}")]
    CursorDecodeError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
