//! In-process TTL cache adapter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use rates_types::{KeyValueCache, RepoError};

/// Cached value with its expiration deadline.
///
/// A TTL too large to represent as an `Instant` never expires.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub live_entries: usize,
    pub expired_entries: usize,
}

/// Thread-safe key-value cache with per-entry TTL.
///
/// Expiration is lazy: an expired entry is dropped when it is next read.
/// When `max_entries` is reached, expired entries are purged before insert.
pub struct MemoryCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    max_entries: usize,
}

impl<V: Clone + Send + Sync + 'static> MemoryCache<V> {
    /// Default capacity before an insert triggers a purge of expired entries.
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live());
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.entries.len();
        let live = self.entries.iter().filter(|e| e.is_live()).count();

        CacheStats {
            total_entries: total,
            live_entries: live,
            expired_entries: total - live,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> KeyValueCache<V> for MemoryCache<V> {
    async fn get(&self, key: &str) -> Result<Option<V>, RepoError> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live() {
                debug!(key, "Cache hit");
                return Ok(Some(entry.value.clone()));
            }
            drop(entry);
            debug!(key, "Cache entry expired");
            self.entries.remove_if(key, |_, entry| !entry.is_live());
        }

        debug!(key, "Cache miss");
        Ok(None)
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) -> Result<(), RepoError> {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.purge_expired();
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, RepoError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, RepoError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[tokio::test]
    async fn test_cache_set_and_get() {
        let cache = MemoryCache::new();
        cache.set("currency:rate:USD", 31, DAY).await.unwrap();

        assert_eq!(cache.get("currency:rate:USD").await.unwrap(), Some(31));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache: MemoryCache<i32> = MemoryCache::new();
        assert!(cache.get("currency:rate:EUR").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("currency:rate:USD", 31, Duration::from_millis(50))
            .await
            .unwrap();

        // Should be live immediately
        assert!(cache.get("currency:rate:USD").await.unwrap().is_some());

        sleep(Duration::from_millis(60));

        // Expired entries read as absent and are dropped
        assert!(cache.get("currency:rate:USD").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_set_overwrites_and_refreshes_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", 1, Duration::from_millis(30))
            .await
            .unwrap();
        cache.set("k", 2, DAY).await.unwrap();

        sleep(Duration::from_millis(40));

        assert_eq!(cache.get("k").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache
            .set("k", 1, Duration::from_secs(u64::MAX))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(1));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new();
        cache.set("k", 1, DAY).await.unwrap();

        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_namespace() {
        let cache = MemoryCache::new();
        cache.set("currency:rate:USD", 1, DAY).await.unwrap();
        cache.set("currency:rate:EUR", 2, DAY).await.unwrap();
        cache.set("order:42", 3, DAY).await.unwrap();

        let removed = cache.delete_prefix("currency:rate:").await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("order:42").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_purge_expired_on_capacity() {
        let cache = MemoryCache::with_max_entries(2);
        cache
            .set("a", 1, Duration::from_millis(10))
            .await
            .unwrap();
        cache
            .set("b", 2, Duration::from_millis(10))
            .await
            .unwrap();

        sleep(Duration::from_millis(20));
        cache.set("c", 3, DAY).await.unwrap();

        assert_eq!(
            cache.stats(),
            CacheStats {
                total_entries: 1,
                live_entries: 1,
                expired_entries: 0,
            }
        );
    }
}
