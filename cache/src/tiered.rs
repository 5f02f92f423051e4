use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::memory::MemoryTier;
use crate::remote::RedisTier;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub prefix: String,
    pub capacity: usize,
    pub default_ttl_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: "cache".to_string(),
            capacity: 100,
            default_ttl_ms: None,
        }
    }
}

impl CacheConfig {
    /// Reads `REDIS_KEY_PREFIX` (falls back to the existing prefix) — the
    /// cache factory's environment contract; connection details
    /// (`REDIS_HOST`/`REDIS_PORT`/`REDIS_PASSWORD`/`REDIS_DB`/`REDIS_TLS`)
    /// are consumed separately when building the remote tier's URL.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(prefix) = std::env::var("REDIS_KEY_PREFIX") {
            config.prefix = prefix;
        }
        config
    }
}

/// Builds a `redis://` URL from the environment variables the cache factory
/// recognises, falling back to localhost defaults.
pub fn redis_url_from_env() -> String {
    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
    let db = std::env::var("REDIS_DB").unwrap_or_else(|_| "0".to_string());
    let scheme = if std::env::var("REDIS_TLS").map(|v| v == "true").unwrap_or(false) {
        "rediss"
    } else {
        "redis"
    };
    match std::env::var("REDIS_PASSWORD") {
        Ok(password) if !password.is_empty() => {
            format!("{scheme}://:{password}@{host}:{port}/{db}")
        }
        _ => format!("{scheme}://{host}:{port}/{db}"),
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub backend_label: &'static str,
}

/// Uniform `get`/`set`/`delete`/`delete_pattern`/`clear` surface over an
/// in-process LRU, optionally backed by a remote tier treated as
/// best-effort: any remote failure is logged and the call falls through to
/// the local tier, which is always kept warm by `set`.
pub struct TieredCache<V> {
    memory: MemoryTier<V>,
    remote: Option<RedisTier>,
    config: CacheConfig,
}

impl<V: Clone + Serialize + DeserializeOwned> TieredCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let memory = MemoryTier::new(config.capacity);
        Self {
            memory,
            remote: None,
            config,
        }
    }

    pub fn with_remote(mut self, remote: RedisTier) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn backend_label(&self) -> &'static str {
        if self.remote.is_some() {
            "tiered(memory+redis)"
        } else {
            "memory"
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.prefix, key)
    }

    /// Returns the value if present and unexpired; otherwise `None`. Remote
    /// errors never propagate — the in-memory fallback is consulted instead.
    pub async fn get(&self, key: &str) -> Option<V> {
        let full = self.full_key(key);
        if let Some(remote) = &self.remote {
            match remote.get::<V>(&full).await {
                Ok(Some(value)) => {
                    self.memory.set(full, value.clone(), self.config.default_ttl_ms);
                    return Some(value);
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, key = %full, "remote cache get failed, falling back to memory"),
            }
        }
        self.memory.get(&full)
    }

    /// Writes to the remote backend (best-effort) and always to the
    /// in-memory fallback, so the fallback stays warm for subsequent reads
    /// even when the remote write succeeds.
    pub async fn set(&self, key: &str, value: V, ttl_ms: Option<u64>)
    where
        V: Clone,
    {
        let full = self.full_key(key);
        let ttl = ttl_ms.or(self.config.default_ttl_ms);
        if let Some(remote) = &self.remote {
            if let Err(err) = remote.set(&full, &value, ttl).await {
                warn!(error = %err, key = %full, "remote cache set failed");
            }
        }
        self.memory.set(full, value, ttl);
    }

    pub async fn delete(&self, key: &str) -> bool {
        let full = self.full_key(key);
        if let Some(remote) = &self.remote {
            if let Err(err) = remote.delete(&full).await {
                warn!(error = %err, key = %full, "remote cache delete failed");
            }
        }
        self.memory.delete(&full)
    }

    /// Matches keys by their suffix after this cache's configured prefix.
    /// Returns the remote-tier count when the remote tier is healthy,
    /// otherwise the local fallback count.
    pub async fn delete_pattern(&self, glob: &str) -> usize {
        let full_glob = self.full_key(glob);
        let remote_count = if let Some(remote) = &self.remote {
            match remote.delete_pattern(&full_glob).await {
                Ok(count) => Some(count),
                Err(err) => {
                    warn!(error = %err, pattern = %full_glob, "remote delete_pattern failed");
                    None
                }
            }
        } else {
            None
        };
        let local_count = self.memory.delete_pattern(&full_glob);
        remote_count.unwrap_or(local_count)
    }

    /// Removes every entry under this cache's prefix from both tiers and
    /// resets metrics.
    pub async fn clear(&self) {
        if let Some(remote) = &self.remote {
            if let Err(err) = remote.clear(&self.config.prefix).await {
                warn!(error = %err, "remote cache clear failed");
            }
        }
        self.memory.clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let hits = self.memory.hits();
        let misses = self.memory.misses();
        let hit_rate = if hits + misses == 0 {
            0.0
        } else {
            hits as f64 / (hits + misses) as f64
        };
        CacheMetrics {
            hits,
            misses,
            hit_rate,
            size: self.memory.len(),
            backend_label: self.backend_label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_only_round_trip() {
        let cache: TieredCache<i32> = TieredCache::new(CacheConfig::default());
        cache.set("k1", 42, None).await;
        assert_eq!(cache.get("k1").await, Some(42));
    }

    #[tokio::test]
    async fn metrics_hit_rate_is_zero_with_no_activity() {
        let cache: TieredCache<i32> = TieredCache::new(CacheConfig::default());
        let metrics = cache.metrics();
        assert_eq!(metrics.hit_rate, 0.0);
        assert_eq!(metrics.backend_label, "memory");
    }

    #[tokio::test]
    async fn delete_pattern_is_scoped_to_prefix() {
        let cache: TieredCache<i32> = TieredCache::new(CacheConfig {
            prefix: "scope_a".into(),
            ..Default::default()
        });
        cache.set("user:1:memory:aa", 1, None).await;
        cache.set("user:1:memory:bb", 2, None).await;
        let removed = cache.delete_pattern("user:1:memory:*").await;
        assert_eq!(removed, 2);
    }
}
