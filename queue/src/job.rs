use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

/// A single embedding-generation job tracked by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub memory_id: String,
    pub user_id: String,
    pub content: String,
    pub sector: String,
    pub status: JobStatus,
    pub attempt: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: String, memory_id: String, content: String, sector: String, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            memory_id,
            user_id,
            content,
            sector,
            status: JobStatus::Pending,
            attempt: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Aggregate counts across the job table.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub complete: usize,
    pub failed: usize,
    pub total: usize,
}
