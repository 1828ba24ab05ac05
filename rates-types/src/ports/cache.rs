//! Key-value cache port trait.
//!
//! Any backing technology (in-process map, external cache service) can sit
//! in front of the store as long as it offers these operations. Values are
//! handed over as-is; serialization, if any, is the adapter's concern.

use std::time::Duration;

use crate::error::RepoError;

/// A TTL-based key-value cache.
///
/// Expired entries must be reported as absent.
#[async_trait::async_trait]
pub trait KeyValueCache<V>: Send + Sync + 'static
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns the live value for `key`.
    async fn get(&self, key: &str) -> Result<Option<V>, RepoError>;

    /// Stores `value` under `key`, replacing any previous entry, expiring after `ttl`.
    async fn set(&self, key: &str, value: V, ttl: Duration) -> Result<(), RepoError>;

    /// Removes `key`. Returns false if it was not present.
    async fn delete(&self, key: &str) -> Result<bool, RepoError>;

    /// Removes every key starting with `prefix`. Returns how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, RepoError>;
}
