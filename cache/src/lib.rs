//! Tiered cache: LRU in-memory tier with an optional remote backend that
//! falls back gracefully on any failure.

mod entry;
mod key;
mod memory;
mod remote;
mod tiered;

pub use entry::CacheEntry;
pub use key::{cache_key, glob_match};
pub use memory::MemoryTier;
pub use remote::RedisTier;
pub use tiered::{CacheConfig, CacheMetrics, TieredCache};

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}
