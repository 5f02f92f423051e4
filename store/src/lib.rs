//! Persistence for per-sector embeddings and the weighted memory link graph:
//! `EmbeddingStore` for storage/similarity search, `GraphTraversal` for
//! BFS/DFS/shortest-path expansion of `memory_links`.

mod client;
mod cursor;
mod embedding_store;
mod error;
mod graph;
mod memory_repo;
mod models;
mod queries;

pub use client::{StoreClient, StoreConfig};
pub use cursor::Cursor;
pub use embedding_store::{EmbeddingStore, SimilarityMatch};
pub use error::{StorageError, StorageResult};
pub use graph::{
    ConnectedMemories, GraphTraversal, Link, Path, TraversalOptions, TraversalOrder,
    PATH_CONTENT_TRUNCATE_LEN,
};
pub use memory_repo::MemoryRepository;
pub use models::{LinkType, Memory, MemoryId, MemoryLink};
