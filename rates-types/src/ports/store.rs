//! Rate store port trait.
//!
//! The durable, authoritative home of rate records. Adapters (SQLite,
//! in-memory) implement this trait.

use crate::domain::{CurrencyCode, RateRecord};
use crate::error::RepoError;

/// Key-indexed durable storage for rate records, keyed by currency code.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync + 'static {
    /// Finds the record for `code`, if any.
    async fn find(&self, code: CurrencyCode) -> Result<Option<RateRecord>, RepoError>;

    /// Lists every stored record ordered by code.
    async fn find_all(&self) -> Result<Vec<RateRecord>, RepoError>;

    /// Inserts or overwrites the record for `record.code`.
    async fn save(&self, record: &RateRecord) -> Result<RateRecord, RepoError>;

    /// Deletes the record for `code`. Returns false if nothing was stored.
    async fn delete(&self, code: CurrencyCode) -> Result<bool, RepoError>;
}
