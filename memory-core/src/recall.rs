use serde::{Deserialize, Serialize};

use memory_store::Memory;

/// A single ranked result from `MemorySystem::recall`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalledMemory {
    pub memory: Memory,
    pub similarity: f32,
}
