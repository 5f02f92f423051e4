use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use crate::entry::CacheEntry;
use crate::CacheResult;

/// Best-effort remote tier. Every method can fail; callers (the
/// `TieredCache`) are responsible for falling back to the local tier on
/// error rather than surfacing it.
pub struct RedisTier {
    manager: ConnectionManager,
}

impl RedisTier {
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }

    pub async fn get<V: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<V>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => {
                let entry: CacheEntry<V> = serde_json::from_str(&json)?;
                if entry.is_expired() {
                    let _: () = conn.del(key).await?;
                    Ok(None)
                } else {
                    Ok(Some(entry.value))
                }
            }
            None => Ok(None),
        }
    }

    pub async fn set<V: Serialize>(&self, key: &str, value: &V, ttl_ms: Option<u64>) -> CacheResult<()>
    where
        V: Clone,
    {
        let entry = CacheEntry::new(value.clone(), ttl_ms);
        let json = serde_json::to_string(&entry)?;
        let mut conn = self.manager.clone();
        match ttl_ms {
            Some(0) => {
                // expires immediately; don't bother writing it.
            }
            Some(ms) => {
                let _: () = conn.set_ex(key, json, ms.div_ceil(1000).max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, json).await?;
            }
        }
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.manager.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    /// Redis's own glob syntax for `KEYS` matches the cache's pattern
    /// language (`*`/`?`), so the pattern is passed through unchanged.
    pub async fn delete_pattern(&self, glob: &str) -> CacheResult<usize> {
        let mut conn = self.manager.clone();
        let keys: Vec<String> = conn.keys(glob).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: i64 = conn.del(&keys).await?;
        Ok(removed as usize)
    }

    pub async fn clear(&self, prefix: &str) -> CacheResult<()> {
        self.delete_pattern(&format!("{}:*", prefix)).await?;
        Ok(())
    }
}
