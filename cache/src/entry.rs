use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A typed value with an absolute expiry instant and insertion order, the
/// unit both cache tiers store and evict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Option<DateTime<Utc>>,
    pub inserted_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl_ms: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            value,
            expires_at: ttl_ms.map(|ms| now + chrono::Duration::milliseconds(ms as i64)),
            inserted_at: now,
        }
    }

    /// An entry is observable only while its expiry instant is in the future.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() >= at,
            None => false,
        }
    }
}
