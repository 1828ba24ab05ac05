//! In-memory store adapter.
//!
//! Used for tests and for running without a database file (`memory://`).
//! Contents are lost when the process exits.

use async_trait::async_trait;
use dashmap::DashMap;

use rates_types::{CurrencyCode, RateRecord, RateStore, RepoError};

/// `DashMap`-backed rate store.
#[derive(Default)]
pub struct MemoryRateStore {
    records: DashMap<CurrencyCode, RateRecord>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn find(&self, code: CurrencyCode) -> Result<Option<RateRecord>, RepoError> {
        Ok(self.records.get(&code).map(|entry| entry.value().clone()))
    }

    async fn find_all(&self) -> Result<Vec<RateRecord>, RepoError> {
        let mut records: Vec<RateRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(|r| r.code.code());
        Ok(records)
    }

    async fn save(&self, record: &RateRecord) -> Result<RateRecord, RepoError> {
        self.records.insert(record.code, record.clone());
        Ok(record.clone())
    }

    async fn delete(&self, code: CurrencyCode) -> Result<bool, RepoError> {
        Ok(self.records.remove(&code).is_some())
    }
}
