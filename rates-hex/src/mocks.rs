//! Hand-written port doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use rates_repo::{MemoryCache, MemoryRateStore};
use rates_types::{
    CurrencyCode, KeyValueCache, RateFeed, RateQuotes, RateRecord, RateStore, RepoError,
};

use crate::repository::RateRepository;

pub fn quotes(entries: &[(&str, Decimal)]) -> RateQuotes {
    entries
        .iter()
        .map(|(code, rate)| (code.to_string(), *rate))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store that counts reads and can fail writes for one code.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryRateStore,
    finds: AtomicUsize,
    saves: AtomicUsize,
    fail_save_on: Mutex<Option<CurrencyCode>>,
    fail_all: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_save_on(&self, code: CurrencyCode) {
        *self.fail_save_on.lock() = Some(code);
    }

    pub fn fail_everything(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Writes straight to the backing store, bypassing validation.
    pub async fn insert_raw(&self, record: RateRecord) {
        self.inner.save(&record).await.unwrap();
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(RepoError::Database("database is locked".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RateStore for CountingStore {
    async fn find(&self, code: CurrencyCode) -> Result<Option<RateRecord>, RepoError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.find(code).await
    }

    async fn find_all(&self) -> Result<Vec<RateRecord>, RepoError> {
        self.check()?;
        self.inner.find_all().await
    }

    async fn save(&self, record: &RateRecord) -> Result<RateRecord, RepoError> {
        self.check()?;
        if *self.fail_save_on.lock() == Some(record.code) {
            return Err(RepoError::Database(format!("write failed for {}", record.code)));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(record).await
    }

    async fn delete(&self, code: CurrencyCode) -> Result<bool, RepoError> {
        self.check()?;
        self.inner.delete(code).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// TTL cache whose reads and writes can be made to fail.
pub struct FlakyCache {
    inner: MemoryCache<RateRecord>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCache::new(),
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub async fn peek(&self, key: &str) -> Option<RateRecord> {
        self.inner.get(key).await.unwrap()
    }

    pub async fn seed(&self, key: &str, record: RateRecord) {
        self.inner
            .set(key, record, Duration::from_secs(60))
            .await
            .unwrap();
    }
}

#[async_trait]
impl KeyValueCache<RateRecord> for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<RateRecord>, RepoError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(RepoError::Cache("connection reset".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: RateRecord, ttl: Duration) -> Result<(), RepoError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(RepoError::Cache("connection reset".into()));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, RepoError> {
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, RepoError> {
        self.inner.delete_prefix(prefix).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Feed
// ─────────────────────────────────────────────────────────────────────────────

pub enum FeedStep {
    Quotes(RateQuotes),
    Panic,
}

/// Feed that replays scripted steps, then keeps returning `fallback`.
///
/// When gated, every fetch waits for a permit released by the test.
pub struct ScriptedFeed {
    steps: Mutex<VecDeque<FeedStep>>,
    fallback: RateQuotes,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedFeed {
    pub fn returning(fallback: RateQuotes) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn with_steps(mut self, steps: Vec<FeedStep>) -> Self {
        self.steps = Mutex::new(steps.into());
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release(&self, fetches: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(fetches);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateFeed for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_latest_rates(&self) -> RateQuotes {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let step = self.steps.lock().pop_front();
        match step {
            Some(FeedStep::Quotes(quotes)) => quotes,
            Some(FeedStep::Panic) => panic!("scripted feed failure"),
            None => self.fallback.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────────────────────────────────────

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub cache: Arc<FlakyCache>,
    pub repo: RateRepository,
}

pub fn harness() -> Harness {
    let store = Arc::new(CountingStore::new());
    let cache = Arc::new(FlakyCache::new());
    let repo = RateRepository::new(store.clone(), cache.clone());
    Harness { store, cache, repo }
}
