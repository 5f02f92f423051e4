use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MemoryId = String;

/// The primary entity: a piece of textual content owned by exactly one
/// user, carrying the salience/strength/decay bookkeeping the decay and
/// recall paths read.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Memory {
    pub id: MemoryId,
    pub user_id: String,
    pub session_id: String,
    pub content: String,
    pub primary_sector: String,
    pub salience: f32,
    pub strength: f32,
    pub access_count: i32,
    pub decay_rate: f32,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A directed, typed, weighted edge between two memories owned by the same
/// user. At most one link per `(source, target, type)`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemoryLink {
    pub source_id: MemoryId,
    pub target_id: MemoryId,
    pub link_type: String,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
    pub traversal_count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Semantic,
    Causal,
    Temporal,
    Analogical,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Semantic => "semantic",
            LinkType::Causal => "causal",
            LinkType::Temporal => "temporal",
            LinkType::Analogical => "analogical",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EmbeddingRow {
    pub memory_id: MemoryId,
    pub sector: String,
    pub embedding: pgvector::Vector,
    pub dimension: i32,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
}
