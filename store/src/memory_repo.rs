use chrono::Utc;

use crate::client::StoreClient;
use crate::error::{StorageError, StorageResult};
use crate::models::Memory;
use crate::queries::memory_queries;

/// Thin CRUD over the `memories` table. Embedding persistence and graph
/// traversal live in `EmbeddingStore`/`GraphTraversal`; this is just the
/// memory row itself.
pub struct MemoryRepository {
    client: StoreClient,
}

impl MemoryRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn insert(&self, memory: &Memory) -> StorageResult<()> {
        sqlx::query(memory_queries::INSERT)
            .bind(&memory.id)
            .bind(&memory.user_id)
            .bind(&memory.session_id)
            .bind(&memory.content)
            .bind(&memory.primary_sector)
            .bind(memory.salience)
            .bind(memory.strength)
            .bind(memory.access_count)
            .bind(memory.decay_rate)
            .bind(memory.created_at)
            .execute(self.client.pool())
            .await?;
        Ok(())
    }

    pub async fn get(&self, memory_id: &str) -> StorageResult<Memory> {
        sqlx::query_as(memory_queries::SELECT_BY_ID)
            .bind(memory_id)
            .fetch_optional(self.client.pool())
            .await?
            .ok_or_else(|| StorageError::NotFound(memory_id.to_string()))
    }

    pub async fn try_get(&self, memory_id: &str) -> StorageResult<Option<Memory>> {
        let memory = sqlx::query_as(memory_queries::SELECT_BY_ID)
            .bind(memory_id)
            .fetch_optional(self.client.pool())
            .await?;
        Ok(memory)
    }

    pub async fn touch_access(&self, memory_id: &str) -> StorageResult<()> {
        sqlx::query(memory_queries::TOUCH_ACCESS)
            .bind(memory_id)
            .bind(Utc::now())
            .execute(self.client.pool())
            .await?;
        Ok(())
    }

    /// Tombstones the row; sector embeddings and links are left in place.
    pub async fn soft_delete(&self, memory_id: &str) -> StorageResult<()> {
        sqlx::query(memory_queries::SOFT_DELETE)
            .bind(memory_id)
            .bind(Utc::now())
            .execute(self.client.pool())
            .await?;
        Ok(())
    }

    /// Removes the row itself. Callers are expected to drop the memory's
    /// sector embeddings and links first (`EmbeddingStore::delete`,
    /// `GraphTraversal`'s link cleanup) since this repository only owns the
    /// `memories` table.
    pub async fn hard_delete(&self, memory_id: &str) -> StorageResult<()> {
        sqlx::query(memory_queries::HARD_DELETE)
            .bind(memory_id)
            .execute(self.client.pool())
            .await?;
        Ok(())
    }
}

