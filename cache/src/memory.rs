use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use lru::LruCache;
use serde::{de::DeserializeOwned, Serialize};

use crate::entry::CacheEntry;
use crate::key::glob_match;

/// Bounded in-memory LRU tier. Insertion appends, a successful `get` moves
/// the entry to the tail, and an insertion past capacity evicts the head.
pub struct MemoryTier<V> {
    entries: RwLock<LruCache<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone + Serialize + DeserializeOwned> MemoryTier<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the value if present and unexpired; an expired entry observed
    /// on read is removed and counted as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Updating an existing key does not evict; a brand new key may evict
    /// the least-recently-used entry.
    pub fn set(&self, key: String, value: V, ttl_ms: Option<u64>) {
        let mut entries = self.entries.write().unwrap();
        entries.put(key, CacheEntry::new(value, ttl_ms));
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().unwrap().pop(key).is_some()
    }

    /// Removes every key matching `glob` and returns the count removed.
    pub fn delete_pattern(&self, glob: &str) -> usize {
        let mut entries = self.entries.write().unwrap();
        let matching: Vec<String> = entries
            .iter()
            .map(|(k, _)| k.clone())
            .filter(|k| glob_match(glob, k))
            .collect();
        for key in &matching {
            entries.pop(key);
        }
        matching.len()
    }

    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Live entry count; expired-but-not-yet-observed entries are still
    /// counted until the next `get` evicts them.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_evicts_head_past_capacity() {
        let tier: MemoryTier<i32> = MemoryTier::new(3);
        tier.set("k1".into(), 1, None);
        tier.set("k2".into(), 2, None);
        tier.set("k3".into(), 3, None);
        tier.get("k1"); // k1 moves to tail
        tier.set("k4".into(), 4, None);

        assert_eq!(tier.get("k1"), Some(1));
        assert_eq!(tier.get("k2"), None);
        assert_eq!(tier.get("k3"), Some(3));
        assert_eq!(tier.get("k4"), Some(4));
    }

    #[test]
    fn ttl_zero_expires_immediately() {
        let tier: MemoryTier<i32> = MemoryTier::new(10);
        tier.set("k".into(), 1, Some(0));
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(tier.get("k"), None);
    }

    #[test]
    fn delete_pattern_matches_glob() {
        let tier: MemoryTier<i32> = MemoryTier::new(10);
        tier.set("user:1:memory:aa".into(), 1, None);
        tier.set("user:1:memory:bb".into(), 2, None);
        tier.set("user:2:memory:cc".into(), 3, None);
        let removed = tier.delete_pattern("user:1:memory:*");
        assert_eq!(removed, 2);
        assert_eq!(tier.len(), 1);
    }
}
