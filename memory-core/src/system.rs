use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use memory_cache::{CacheConfig, TieredCache};
use memory_embedding::{EmbeddingEngine, EmbeddingModel, Sector};
use memory_queue::{EmbeddingQueue, QueueStats};
use memory_store::{EmbeddingStore, GraphTraversal, Memory, MemoryRepository, StoreClient};

use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::recall::RecalledMemory;

/// Wires the five components together into the write and read paths the
/// spec's data-flow diagrams describe.
pub struct MemorySystem {
    memories: Arc<MemoryRepository>,
    embeddings: Arc<EmbeddingEngine>,
    embedding_store: Arc<EmbeddingStore>,
    graph: Arc<GraphTraversal>,
    queue: Arc<EmbeddingQueue>,
    recall_cache: Arc<TieredCache<Vec<RecalledMemory>>>,
    model_name: String,
}

impl MemorySystem {
    /// Connects to the store, builds every component, and wires the queue's
    /// generator to the full generate-then-persist cycle.
    pub async fn init(config: MemoryConfig, model: Arc<dyn EmbeddingModel>) -> MemoryResult<Self> {
        let store_client = StoreClient::connect(&config.store).await?;
        let memories = Arc::new(MemoryRepository::new(store_client.clone()));
        let embedding_store = Arc::new(EmbeddingStore::new(store_client.clone()));
        let graph = Arc::new(GraphTraversal::new(store_client.clone()));
        let embeddings = Arc::new(EmbeddingEngine::new(model, config.engine.clone()));
        let queue = Arc::new(EmbeddingQueue::new(config.queue));

        let recall_cache_config = CacheConfig {
            prefix: "recall".to_string(),
            capacity: config.cache.capacity,
            default_ttl_ms: config.cache.default_ttl_ms,
        };
        let recall_cache = Arc::new(TieredCache::new(recall_cache_config));

        let system = Self {
            memories,
            embeddings,
            embedding_store,
            graph,
            queue,
            recall_cache,
            model_name: config.model_name,
        };
        system.wire_queue();
        Ok(system)
    }

    fn wire_queue(&self) {
        let embeddings = self.embeddings.clone();
        let embedding_store = self.embedding_store.clone();
        let model_name = self.model_name.clone();
        self.queue.set_generator(Arc::new(move |memory_id, content, _sector| {
            let embeddings = embeddings.clone();
            let embedding_store = embedding_store.clone();
            let model_name = model_name.clone();
            Box::pin(async move {
                let vectors = embeddings
                    .generate_all(&content)
                    .await
                    .map_err(|e| e.to_string())?;
                embedding_store
                    .store(&memory_id, &vectors, &model_name)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(())
            })
        }));

        self.queue.set_on_complete(Arc::new(|memory_id, user_id, success, error| {
            if success {
                info!(memory_id, user_id, "embedding generation complete");
            } else {
                warn!(memory_id, user_id, error = ?error, "embedding generation failed permanently");
            }
        }));
    }

    /// Persists the memory row, enqueues the embedding job, and returns the
    /// new memory's id immediately — the write path never blocks on
    /// embedding generation.
    pub async fn store_memory(
        &self,
        user_id: &str,
        session_id: &str,
        content: &str,
        primary_sector: Sector,
    ) -> MemoryResult<String> {
        if content.trim().is_empty() {
            return Err(MemoryError::Validation("memory content must not be empty".to_string()));
        }

        let memory_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let memory = Memory {
            id: memory_id.clone(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            content: content.to_string(),
            primary_sector: primary_sector.tag().to_string(),
            salience: 0.5,
            strength: 1.0,
            access_count: 0,
            decay_rate: 0.01,
            created_at: now,
            last_accessed: now,
            deleted_at: None,
        };
        self.memories.insert(&memory).await?;
        self.queue.enqueue(&memory_id, content, primary_sector.tag(), user_id);
        Ok(memory_id)
    }

    /// Generates the query embedding per requested sector, checks the recall
    /// cache, and otherwise runs a weighted multi-sector similarity search.
    pub async fn recall(
        &self,
        user_id: &str,
        query: &str,
        weights: &HashMap<Sector, f32>,
        limit: usize,
    ) -> MemoryResult<Vec<RecalledMemory>> {
        let fingerprint = recall_fingerprint(user_id, query, weights, limit);
        if let Some(cached) = self.recall_cache.get(&fingerprint).await {
            return Ok(cached);
        }

        let mut query_vectors = HashMap::new();
        for (&sector, &weight) in weights {
            if weight <= 0.0 {
                continue;
            }
            let vector = self.generate_for_sector(sector, query).await?;
            query_vectors.insert(sector, vector);
        }

        let matches = self
            .embedding_store
            .multi_sector_search(&query_vectors, weights, user_id, limit)
            .await?;

        let mut results = Vec::with_capacity(matches.len());
        for candidate in matches {
            match self.memories.try_get(&candidate.memory_id).await? {
                Some(memory) => results.push(RecalledMemory {
                    memory,
                    similarity: candidate.similarity,
                }),
                None => continue,
            }
        }

        self.recall_cache.set(&fingerprint, results.clone(), None).await;
        Ok(results)
    }

    async fn generate_for_sector(&self, sector: Sector, text: &str) -> MemoryResult<Vec<f32>> {
        let vector = match sector {
            Sector::Episodic => {
                self.embeddings
                    .generate_episodic(text, &Default::default())
                    .await?
            }
            Sector::Semantic => self.embeddings.generate_semantic(text).await?,
            Sector::Procedural => self.embeddings.generate_procedural(text).await?,
            Sector::Emotional => {
                self.embeddings
                    .generate_emotional(text, &Default::default())
                    .await?
            }
            Sector::Reflective => {
                self.embeddings
                    .generate_reflective(text, &Default::default())
                    .await?
            }
        };
        Ok(vector)
    }

    pub fn graph(&self) -> &GraphTraversal {
        &self.graph
    }

    pub fn embedding_store(&self) -> &EmbeddingStore {
        &self.embedding_store
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub async fn wait_for_embeddings(&self) {
        self.queue.wait_for_completion().await;
    }

    /// Tombstones the memory; sector embeddings and links are left intact,
    /// so a soft-deleted memory can still be restored in principle.
    pub async fn delete_memory(&self, memory_id: &str) -> MemoryResult<()> {
        self.memories.soft_delete(memory_id).await?;
        Ok(())
    }

    /// Removes the memory row, its sector embeddings, and its links
    /// entirely. Irreversible.
    pub async fn purge_memory(&self, memory_id: &str) -> MemoryResult<()> {
        self.embedding_store.delete(memory_id).await?;
        self.graph.delete_links_for_memory(memory_id).await?;
        self.memories.hard_delete(memory_id).await?;
        Ok(())
    }

    /// Periodic sweep: drops terminal (complete/failed) job records from the
    /// queue's table. Memory decay and consolidation live outside C1-C6 and
    /// aren't implemented here; expired cache entries are reclaimed lazily
    /// on the next read rather than by a proactive sweep.
    pub async fn run_maintenance(&self) -> MemoryResult<MaintenanceResult> {
        let cleared_jobs = self.queue.clear_finished();
        info!(cleared_jobs, "maintenance sweep complete");
        Ok(MaintenanceResult { cleared_jobs })
    }
}

/// Outcome of a [`MemorySystem::run_maintenance`] sweep.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct MaintenanceResult {
    pub cleared_jobs: usize,
}

fn recall_fingerprint(user_id: &str, query: &str, weights: &HashMap<Sector, f32>, limit: usize) -> String {
    let mut pairs: Vec<(&'static str, f32)> = weights.iter().map(|(s, w)| (s.tag(), *w)).collect();
    pairs.sort_by_key(|(tag, _)| *tag);
    let weights_str = pairs
        .iter()
        .map(|(tag, w)| format!("{tag}={w:.3}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("{user_id}:{query}:{weights_str}:{limit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_regardless_of_weight_insertion_order() {
        let mut a = HashMap::new();
        a.insert(Sector::Semantic, 0.6);
        a.insert(Sector::Episodic, 0.4);

        let mut b = HashMap::new();
        b.insert(Sector::Episodic, 0.4);
        b.insert(Sector::Semantic, 0.6);

        assert_eq!(
            recall_fingerprint("user-1", "coffee shops", &a, 5),
            recall_fingerprint("user-1", "coffee shops", &b, 5),
        );
    }

    #[test]
    fn fingerprint_changes_with_query_or_limit() {
        let mut weights = HashMap::new();
        weights.insert(Sector::Semantic, 1.0);

        let base = recall_fingerprint("user-1", "coffee shops", &weights, 5);
        assert_ne!(base, recall_fingerprint("user-1", "tea shops", &weights, 5));
        assert_ne!(base, recall_fingerprint("user-1", "coffee shops", &weights, 10));
    }

    #[test]
    fn zero_weight_sectors_are_excluded_from_query_vectors() {
        // Mirrors the filter in `recall`: only sectors with weight > 0.0
        // generate a query vector at all.
        let mut weights = HashMap::new();
        weights.insert(Sector::Semantic, 1.0);
        weights.insert(Sector::Emotional, 0.0);

        let active: Vec<Sector> = weights
            .iter()
            .filter(|(_, &w)| w > 0.0)
            .map(|(&s, _)| s)
            .collect();
        assert_eq!(active, vec![Sector::Semantic]);
    }
}
