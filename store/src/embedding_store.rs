use std::collections::HashMap;

use tracing::{debug, info};

use memory_embedding::{Sector, SectorEmbeddings, Vector};

use crate::client::StoreClient;
use crate::error::{StorageError, StorageResult};
use crate::models::{EmbeddingRow, MemoryId};
use crate::queries::embedding_queries;

/// A single per-sector match from `similarity_search`.
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    pub memory_id: MemoryId,
    pub sector: String,
    pub similarity: f32,
}

/// Persists the five sector vectors per memory and serves per-sector and
/// weighted multi-sector similarity search over them.
pub struct EmbeddingStore {
    client: StoreClient,
}

impl EmbeddingStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Writes all five sector rows in a single transaction. Rejects with
    /// `DimensionMismatch` if the five vectors don't share a length.
    pub async fn store(
        &self,
        memory_id: &str,
        embeddings: &SectorEmbeddings,
        model_name: &str,
    ) -> StorageResult<()> {
        let expected = embeddings.get(Sector::Episodic).len();
        for sector in Sector::ALL {
            let len = embeddings.get(sector).len();
            if len != expected {
                return Err(StorageError::DimensionMismatch {
                    expected,
                    actual: len,
                });
            }
        }

        let mut tx = self.client.pool().begin().await?;
        let now = chrono::Utc::now();
        for sector in Sector::ALL {
            let vector = embeddings.get(sector);
            let pg_vector = pgvector::Vector::from(vector.clone());
            sqlx::query(embedding_queries::UPSERT)
                .bind(memory_id)
                .bind(sector.tag())
                .bind(pg_vector)
                .bind(vector.len() as i32)
                .bind(model_name)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        debug!(memory_id, "stored five sector embeddings");
        Ok(())
    }

    /// Returns the requested sectors (or all five), filling missing entries
    /// with empty vectors so the result always has five slots.
    pub async fn retrieve(
        &self,
        memory_id: &str,
        sectors: Option<&[Sector]>,
    ) -> StorageResult<SectorEmbeddings> {
        let rows: Vec<EmbeddingRow> = sqlx::query_as(embedding_queries::SELECT_ALL_SECTORS)
            .bind(memory_id)
            .fetch_all(self.client.pool())
            .await?;

        let mut out = SectorEmbeddings::default();
        for row in rows {
            let sector = Sector::from_tag(&row.sector).ok_or_else(|| StorageError::CorruptEmbedding {
                memory_id: memory_id.to_string(),
                sector: row.sector.clone(),
                reason: "unrecognised sector tag".to_string(),
            })?;
            if let Some(wanted) = sectors {
                if !wanted.contains(&sector) {
                    continue;
                }
            }
            out.set(sector, row.embedding.to_vec());
        }
        Ok(out)
    }

    /// Upserts the sectors present in `partial`; sectors left empty are
    /// silently skipped rather than overwriting existing rows with zeros.
    pub async fn update(
        &self,
        memory_id: &str,
        partial: &SectorEmbeddings,
        model_name: &str,
    ) -> StorageResult<()> {
        let now = chrono::Utc::now();
        for sector in Sector::ALL {
            let vector = partial.get(sector);
            if vector.is_empty() {
                continue;
            }
            let pg_vector = pgvector::Vector::from(vector.clone());
            sqlx::query(embedding_queries::UPSERT)
                .bind(memory_id)
                .bind(sector.tag())
                .bind(pg_vector)
                .bind(vector.len() as i32)
                .bind(model_name)
                .bind(now)
                .execute(self.client.pool())
                .await?;
        }
        Ok(())
    }

    pub async fn delete(&self, memory_id: &str) -> StorageResult<()> {
        sqlx::query(embedding_queries::DELETE_ALL_SECTORS)
            .bind(memory_id)
            .execute(self.client.pool())
            .await?;
        Ok(())
    }

    /// Top-`limit` memories in `sector` whose cosine similarity to
    /// `query_vector` is at least `threshold`, ordered by descending
    /// similarity (ties broken by ascending memory id).
    pub async fn similarity_search(
        &self,
        query_vector: &Vector,
        sector: Sector,
        user_id: &str,
        limit: usize,
        threshold: f32,
    ) -> StorageResult<Vec<SimilarityMatch>> {
        let pg_query = pgvector::Vector::from(query_vector.clone());
        let rows: Vec<(String, f32)> = sqlx::query_as(embedding_queries::SIMILARITY_SEARCH_SECTOR)
            .bind(pg_query)
            .bind(sector.tag())
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(self.client.pool())
            .await?;

        let mut matches: Vec<SimilarityMatch> = rows
            .into_iter()
            .filter(|(_, score)| *score >= threshold)
            .map(|(memory_id, similarity)| SimilarityMatch {
                memory_id,
                sector: sector.tag().to_string(),
                similarity,
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.memory_id.cmp(&b.memory_id))
        });
        matches.truncate(limit);
        info!(sector = sector.tag(), found = matches.len(), "similarity search complete");
        Ok(matches)
    }

    /// Weighted composite search across every sector with a non-empty query
    /// vector and a strictly positive weight: `score(m) = Σ weight[s] ×
    /// (1 − distance(query[s], stored[m,s]))`, summed per memory.
    pub async fn multi_sector_search(
        &self,
        query_vectors_by_sector: &HashMap<Sector, Vector>,
        weights_by_sector: &HashMap<Sector, f32>,
        user_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<SimilarityMatch>> {
        let mut scores: HashMap<MemoryId, f32> = HashMap::new();

        for (sector, query_vector) in query_vectors_by_sector {
            if query_vector.is_empty() {
                continue;
            }
            let weight = weights_by_sector.get(sector).copied().unwrap_or(0.0);
            if weight <= 0.0 {
                continue;
            }
            let pg_query = pgvector::Vector::from(query_vector.clone());
            let rows: Vec<(String, f32)> = sqlx::query_as(embedding_queries::CANDIDATE_SCORES_FOR_SECTOR)
                .bind(pg_query)
                .bind(sector.tag())
                .bind(user_id)
                .fetch_all(self.client.pool())
                .await?;
            for (memory_id, similarity) in rows {
                *scores.entry(memory_id).or_insert(0.0) += weight * similarity;
            }
        }

        let mut matches: Vec<SimilarityMatch> = scores
            .into_iter()
            .map(|(memory_id, similarity)| SimilarityMatch {
                memory_id,
                sector: "composite".to_string(),
                similarity,
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.memory_id.cmp(&b.memory_id))
        });
        matches.truncate(limit);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_score_sums_weighted_similarities() {
        let mut scores: HashMap<MemoryId, f32> = HashMap::new();
        *scores.entry("m1".to_string()).or_insert(0.0) += 0.6 * 0.8;
        *scores.entry("m1".to_string()).or_insert(0.0) += 0.4 * 0.5;
        assert!((scores["m1"] - (0.6 * 0.8 + 0.4 * 0.5)).abs() < 1e-6);
    }

    #[test]
    fn zero_weight_sectors_never_enter_the_sum() {
        let weights: HashMap<Sector, f32> = [(Sector::Episodic, 0.0), (Sector::Semantic, 0.6)]
            .into_iter()
            .collect();
        assert!(weights.get(&Sector::Episodic).copied().unwrap_or(0.0) <= 0.0);
    }
}
