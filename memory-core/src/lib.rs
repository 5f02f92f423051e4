//! Cognitive memory core — the facade a tool server depends on.
//!
//! Wires the tiered cache, five-sector embedding engine, embedding/graph
//! store, and bounded embedding queue into a single `MemorySystem` exposing
//! `store_memory`/`recall`/`run_maintenance`.

mod config;
mod error;
mod recall;
mod system;

pub use config::MemoryConfig;
pub use error::{MemoryError, MemoryResult};
pub use recall::RecalledMemory;
pub use system::{MaintenanceResult, MemorySystem};

pub use memory_cache::{CacheConfig, CacheError};
pub use memory_embedding::{EmbeddingError, EmbeddingModel, EngineConfig, HttpEmbeddingModel, Sector};
pub use memory_queue::{Job, JobStatus, QueueConfig, QueueStats};
pub use memory_store::{
    ConnectedMemories, Cursor, GraphTraversal, Link, Memory, MemoryLink, Path, SimilarityMatch,
    StorageError, StoreConfig, TraversalOptions, TraversalOrder,
};
