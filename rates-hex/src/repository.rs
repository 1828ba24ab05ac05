//! Rate Repository
//!
//! Cache-aside facade over the durable store. Reads go through the cache,
//! writes go to the store first and then refresh the cache.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use rates_types::{CurrencyCode, KeyValueCache, RateRecord, RateStore, RepoError};

/// Namespace shared by every rate cache key.
pub const CACHE_KEY_PREFIX: &str = "currency:rate:";

/// Default lifetime of a cached rate.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key for `code`, e.g. `currency:rate:USD`.
pub fn cache_key(code: CurrencyCode) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, code.code())
}

/// Read-through / write-through access to rate records.
///
/// The store is authoritative; the cache only ever holds values that were
/// read from, or just written to, the store.
#[derive(Clone)]
pub struct RateRepository {
    store: Arc<dyn RateStore>,
    cache: Arc<dyn KeyValueCache<RateRecord>>,
    ttl: Duration,
}

impl RateRepository {
    pub fn new(store: Arc<dyn RateStore>, cache: Arc<dyn KeyValueCache<RateRecord>>) -> Self {
        Self::with_ttl(store, cache, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(
        store: Arc<dyn RateStore>,
        cache: Arc<dyn KeyValueCache<RateRecord>>,
        ttl: Duration,
    ) -> Self {
        Self { store, cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the record for `code`, reading through the cache.
    ///
    /// Absence is `Ok(None)`. A record found in the store is cached only if
    /// it satisfies the positive-rate invariant.
    pub async fn get(&self, code: CurrencyCode) -> Result<Option<RateRecord>, RepoError> {
        let key = cache_key(code);

        match self.cache.get(&key).await {
            Ok(Some(record)) => return Ok(Some(record)),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, falling back to store"),
        }

        let Some(record) = self.store.find(code).await? else {
            debug!(code = %code, "Rate not found in store");
            return Ok(None);
        };

        if record.is_valid() {
            if let Err(e) = self.cache.set(&key, record.clone(), self.ttl).await {
                warn!(key = %key, error = %e, "Cache fill failed");
            }
        } else {
            warn!(
                code = %code,
                rate = %record.rate_to_base,
                "Stored rate violates invariant, not caching"
            );
        }

        Ok(Some(record))
    }

    /// Persists `record`, then overwrites its cache entry.
    pub async fn put(&self, record: RateRecord) -> Result<RateRecord, RepoError> {
        record.validate()?;

        let saved = self.store.save(&record).await?;

        let key = cache_key(saved.code);
        if let Err(e) = self.cache.set(&key, saved.clone(), self.ttl).await {
            // A stale entry must not outlive the write
            warn!(key = %key, error = %e, "Cache write failed, evicting entry");
            if let Err(e) = self.cache.delete(&key).await {
                warn!(key = %key, error = %e, "Cache eviction failed");
            }
        }

        debug!(code = %saved.code, rate = %saved.rate_to_base, "Rate saved");
        Ok(saved)
    }

    /// Deletes the stored record, then its cache entry.
    ///
    /// Returns whether a stored record existed.
    pub async fn delete(&self, code: CurrencyCode) -> Result<bool, RepoError> {
        let existed = self.store.delete(code).await?;
        self.cache.delete(&cache_key(code)).await?;
        Ok(existed)
    }

    /// Drops the cache entry for `code` without touching the store.
    pub async fn evict(&self, code: CurrencyCode) -> Result<bool, RepoError> {
        self.cache.delete(&cache_key(code)).await
    }

    /// Drops every cached rate. Returns how many entries were removed.
    pub async fn evict_all(&self) -> Result<usize, RepoError> {
        let evicted = self.cache.delete_prefix(CACHE_KEY_PREFIX).await?;
        debug!(evicted, "Rate cache cleared");
        Ok(evicted)
    }

    /// Lists every stored record, ordered by code. Bypasses the cache.
    pub async fn list(&self) -> Result<Vec<RateRecord>, RepoError> {
        self.store.find_all().await
    }
}
