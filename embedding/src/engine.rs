use std::pin::Pin;
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use futures::future::{FutureExt, Shared};
use futures::Future;
use sha2::{Digest, Sha256};
use tracing::debug;

use memory_cache::{CacheConfig, TieredCache};

use crate::augmentation::{
    augment_emotional, augment_episodic, augment_procedural, augment_reflective, augment_semantic,
};
use crate::model::EmbeddingModel;
use crate::types::{EmbeddingError, EmotionState, ReflectiveInsights, Sector, SectorEmbeddings, TemporalContext, Vector};

type PendingFuture = Shared<Pin<Box<dyn Future<Output = Result<Vector, EmbeddingError>> + Send>>>;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_capacity: usize,
    pub cache_ttl_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            cache_ttl_ms: None,
        }
    }
}

/// Turns `(memory_text, sector_context) -> vector` with caching,
/// concurrent-request deduplication, and batch optimisation.
pub struct EmbeddingEngine {
    model: RwLock<Arc<dyn EmbeddingModel>>,
    cache: Arc<TieredCache<Vector>>,
    in_flight: Arc<DashMap<String, PendingFuture>>,
}

impl EmbeddingEngine {
    pub fn new(model: Arc<dyn EmbeddingModel>, config: EngineConfig) -> Self {
        let cache_config = CacheConfig {
            prefix: "embedding".to_string(),
            capacity: config.cache_capacity,
            default_ttl_ms: config.cache_ttl_ms,
        };
        Self {
            model: RwLock::new(model),
            cache: Arc::new(TieredCache::new(cache_config)),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Atomically swaps the active model and clears the cache, since cached
    /// vectors depend on the prior model's dimension.
    pub async fn load_model(&self, model: Arc<dyn EmbeddingModel>) {
        *self.model.write().unwrap() = model;
        self.cache.clear().await;
    }

    fn model(&self) -> Arc<dyn EmbeddingModel> {
        self.model.read().unwrap().clone()
    }

    pub async fn generate_episodic(&self, text: &str, ctx: &TemporalContext) -> Result<Vector, EmbeddingError> {
        let augmented = augment_episodic(text, ctx);
        let key = cache_key(Sector::Episodic, text, &serde_json::to_value(ctx).unwrap_or_default());
        self.resolve(Sector::Episodic, key, augmented).await
    }

    pub async fn generate_semantic(&self, text: &str) -> Result<Vector, EmbeddingError> {
        let augmented = augment_semantic(text);
        let key = cache_key(Sector::Semantic, text, &serde_json::Value::Null);
        self.resolve(Sector::Semantic, key, augmented).await
    }

    pub async fn generate_procedural(&self, text: &str) -> Result<Vector, EmbeddingError> {
        let augmented = augment_procedural(text);
        let key = cache_key(Sector::Procedural, text, &serde_json::Value::Null);
        self.resolve(Sector::Procedural, key, augmented).await
    }

    pub async fn generate_emotional(&self, text: &str, state: &EmotionState) -> Result<Vector, EmbeddingError> {
        let augmented = augment_emotional(text, state);
        let key = cache_key(Sector::Emotional, text, &serde_json::to_value(state).unwrap_or_default());
        self.resolve(Sector::Emotional, key, augmented).await
    }

    pub async fn generate_reflective(&self, text: &str, insights: &ReflectiveInsights) -> Result<Vector, EmbeddingError> {
        let augmented = augment_reflective(text, insights);
        let key = cache_key(Sector::Reflective, text, &serde_json::to_value(insights).unwrap_or_default());
        self.resolve(Sector::Reflective, key, augmented).await
    }

    /// Generates all five sector embeddings for raw memory content. There is
    /// no per-sector context parameter at this call boundary, so each
    /// sector is augmented with the same empty/default context a direct
    /// `generate_*` call would use when none is supplied — this keeps
    /// `generate_all` and the individual calls equal on the same inputs
    /// (the batch-equivalence invariant).
    pub async fn generate_all(&self, memory_content: &str) -> Result<SectorEmbeddings, EmbeddingError> {
        let requests: Vec<(Sector, String, String)> = vec![
            (
                Sector::Episodic,
                cache_key(Sector::Episodic, memory_content, &serde_json::to_value(TemporalContext::default()).unwrap()),
                augment_episodic(memory_content, &TemporalContext::default()),
            ),
            (
                Sector::Semantic,
                cache_key(Sector::Semantic, memory_content, &serde_json::Value::Null),
                augment_semantic(memory_content),
            ),
            (
                Sector::Procedural,
                cache_key(Sector::Procedural, memory_content, &serde_json::Value::Null),
                augment_procedural(memory_content),
            ),
            (
                Sector::Emotional,
                cache_key(Sector::Emotional, memory_content, &serde_json::to_value(EmotionState::default()).unwrap()),
                augment_emotional(memory_content, &EmotionState::default()),
            ),
            (
                Sector::Reflective,
                cache_key(Sector::Reflective, memory_content, &serde_json::to_value(ReflectiveInsights::default()).unwrap()),
                augment_reflective(memory_content, &ReflectiveInsights::default()),
            ),
        ];

        let mut hits = Vec::new();
        let mut misses = Vec::new();
        for (sector, key, augmented) in requests {
            match self.cache.get(&key).await {
                Some(vector) => hits.push((sector, vector)),
                None => misses.push((sector, key, augmented)),
            }
        }

        let mut resolved: Vec<(Sector, Vector)> = hits;

        if misses.len() >= 2 && self.model().supports_batch() {
            let texts: Vec<String> = misses.iter().map(|(_, _, text)| text.clone()).collect();
            let vectors = self.model().generate_batch(&texts).await?;
            if vectors.len() != misses.len() {
                return Err(EmbeddingError::Network(
                    "embedding model returned a mismatched batch size".to_string(),
                ));
            }
            for ((sector, key, _), vector) in misses.into_iter().zip(vectors.into_iter()) {
                self.cache.set(&key, vector.clone(), None).await;
                resolved.push((sector, vector));
            }
        } else {
            let futures = misses
                .into_iter()
                .map(|(sector, key, augmented)| async move {
                    let vector = self.resolve(sector, key, augmented).await?;
                    Ok::<_, EmbeddingError>((sector, vector))
                });
            let results = futures::future::join_all(futures).await;
            for result in results {
                resolved.push(result?);
            }
        }

        let mut out = SectorEmbeddings::default();
        for (sector, vector) in resolved {
            out.set(sector, vector);
        }
        Ok(out)
    }

    pub async fn batch_generate(&self, memories: &[String]) -> Result<Vec<SectorEmbeddings>, EmbeddingError> {
        let mut results = Vec::with_capacity(memories.len());
        for memory in memories {
            results.push(self.generate_all(memory).await?);
        }
        Ok(results)
    }

    /// Cache lookup, in-flight dedup, and model invocation for a single
    /// sector. N concurrent calls with the same `(sector, text, context)`
    /// produce exactly one model call: the first caller registers the
    /// pending future, the rest subscribe to the same `Shared` clone.
    async fn resolve(&self, sector: Sector, key: String, augmented_text: String) -> Result<Vector, EmbeddingError> {
        if let Some(vector) = self.cache.get(&key).await {
            return Ok(vector);
        }

        let mut created = false;
        let shared = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| {
                created = true;
                let cache = self.cache.clone();
                let in_flight = self.in_flight.clone();
                let model = self.model();
                let key_for_task = key.clone();
                let fut: Pin<Box<dyn Future<Output = Result<Vector, EmbeddingError>> + Send>> =
                    Box::pin(async move {
                        let result = model.generate(&augmented_text).await;
                        if let Ok(vector) = &result {
                            cache.set(&key_for_task, vector.clone(), None).await;
                        }
                        in_flight.remove(&key_for_task);
                        result
                    });
                fut.shared()
            })
            .clone();

        if created {
            debug!(sector = sector.tag(), key = %key, "dispatched new embedding generation");
        } else {
            debug!(sector = sector.tag(), key = %key, "joined in-flight embedding generation");
        }

        shared.await
    }
}

fn cache_key(sector: Sector, text: &str, context: &serde_json::Value) -> String {
    let canonical = format!("{}|{}|{}", sector.tag(), text, canonicalize(context));
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

fn canonicalize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, canonicalize(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        calls: AtomicUsize,
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingModel for CountingModel {
        async fn generate(&self, text: &str) -> Result<Vector, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            Ok(vec![text.len() as f32; self.dimension])
        }

        async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingError> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.generate(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    #[tokio::test]
    async fn concurrent_identical_requests_dedupe_to_one_model_call() {
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            dimension: 4,
        });
        let engine = Arc::new(EmbeddingEngine::new(model.clone(), EngineConfig::default()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move { engine.generate_semantic("same text").await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_model_clears_cache() {
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            dimension: 4,
        });
        let engine = EmbeddingEngine::new(model.clone(), EngineConfig::default());
        engine.generate_semantic("hi").await.unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let new_model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            dimension: 4,
        });
        engine.load_model(new_model.clone()).await;
        engine.generate_semantic("hi").await.unwrap();
        assert_eq!(new_model.calls.load(Ordering::SeqCst), 1);
    }
}
