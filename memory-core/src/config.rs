use memory_cache::CacheConfig;
use memory_embedding::EngineConfig;
use memory_queue::QueueConfig;
use memory_store::StoreConfig;

/// Aggregates every component's configuration. Each sub-config keeps its
/// own `from_env`/`Default`; this just wires them together for `MemorySystem::init`.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub cache: CacheConfig,
    pub engine: EngineConfig,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub model_name: String,
    pub embedding_model_host: String,
    pub embedding_dimension: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            engine: EngineConfig::default(),
            store: StoreConfig::from_env(),
            queue: QueueConfig::default(),
            model_name: "default-embedding-model".to_string(),
            embedding_model_host: "http://localhost:8000".to_string(),
            embedding_dimension: 768,
        }
    }
}

impl MemoryConfig {
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            engine: EngineConfig::default(),
            store: StoreConfig::from_env(),
            queue: QueueConfig::from_env(),
            model_name: std::env::var("EMBEDDING_MODEL_NAME")
                .unwrap_or_else(|_| "default-embedding-model".to_string()),
            embedding_model_host: std::env::var("EMBEDDING_MODEL_HOST")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            embedding_dimension: std::env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(768),
        }
    }
}
