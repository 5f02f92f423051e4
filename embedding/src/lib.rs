//! Five-sector embedding generation: per-sector augmentation, caching,
//! in-flight request deduplication, and batch optimisation.

mod augmentation;
mod engine;
mod model;
mod types;

pub use engine::{EmbeddingEngine, EngineConfig};
pub use model::{normalize, EmbeddingModel, HttpEmbeddingModel};
pub use types::{
    EmbeddingError, EmotionState, ReflectiveInsights, Sector, SectorEmbeddings, TemporalContext, Vector,
};
