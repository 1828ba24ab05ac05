//! # Rates Repository
//!
//! Concrete store and cache implementations (adapters) for the currency rate
//! service. This crate provides the adapters that implement the `RateStore`
//! and `KeyValueCache` ports.

use async_trait::async_trait;
use rates_types::{CurrencyCode, RateRecord, RateStore, RepoError};

pub mod cache;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
mod types;


/// URL selecting the in-process store.
pub const MEMORY_URL: &str = "memory://";

/// Unified store wrapper over the available backends.
pub enum Store {
    Memory(memory::MemoryRateStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRateStore),
}

/// Build and initialize a store from a database URL.
///
/// This function:
/// 1. Picks the backend from the URL scheme
/// 2. Connects and runs migrations (SQLite)
/// 3. Returns a ready-to-use `Store`
///
/// # Examples
///
/// ```ignore
/// // SQLite (with `sqlite` feature)
/// let store = build_store("sqlite://data/rates.db?mode=rwc").await?;
///
/// // In-process map, lost on restart
/// let store = build_store("memory://").await?;
/// ```
pub async fn build_store(database_url: &str) -> anyhow::Result<Store> {
    Store::new(database_url).await
}

impl Store {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        if database_url == MEMORY_URL {
            return Ok(Store::Memory(memory::MemoryRateStore::new()));
        }

        #[cfg(feature = "sqlite")]
        {
            if database_url.starts_with("sqlite:") {
                let inner = sqlite::SqliteRateStore::new(database_url).await?;
                return Ok(Store::Sqlite(inner));
            }
        }

        anyhow::bail!("Unsupported DATABASE_URL: {}", database_url)
    }

    /// Short backend name for logs.
    pub fn backend(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Store::Sqlite(_) => "sqlite",
        }
    }
}

// Re-export individual adapters for direct use if needed
pub use cache::MemoryCache;
pub use memory::MemoryRateStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRateStore;

// ─────────────────────────────────────────────────────────────────────────────
// Implement RateStore for Store (delegation)
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateStore for Store {
    async fn find(&self, code: CurrencyCode) -> Result<Option<RateRecord>, RepoError> {
        match self {
            Store::Memory(inner) => inner.find(code).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(inner) => inner.find(code).await,
        }
    }

    async fn find_all(&self) -> Result<Vec<RateRecord>, RepoError> {
        match self {
            Store::Memory(inner) => inner.find_all().await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(inner) => inner.find_all().await,
        }
    }

    async fn save(&self, record: &RateRecord) -> Result<RateRecord, RepoError> {
        match self {
            Store::Memory(inner) => inner.save(record).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(inner) => inner.save(record).await,
        }
    }

    async fn delete(&self, code: CurrencyCode) -> Result<bool, RepoError> {
        match self {
            Store::Memory(inner) => inner.delete(code).await,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(inner) => inner.delete(code).await,
        }
    }
}
