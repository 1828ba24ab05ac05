//! Rate Refresh Scheduler
//!
//! Keeps the rate table fresh by pulling the feed once per period.
//!
//! ## State machine
//!
//! ```text
//!            enable (immediate timer)            timer fires
//! Disabled ───────────────────────────▶ Armed ──────────────▶ Running
//!     ▲                                   │                    │
//!     │            disable                │                    │ cycle done
//!     └───────────────────────────────────┘                    │
//!     ▲                                                        │
//!     └──────── cycle done, disabled ◀─────────────────────────┘
//!                                   cycle done, enabled ──▶ Armed
//! ```
//!
//! Every transition runs inside one short critical section that only touches
//! in-memory state. The feed and store I/O of a cycle never hold the lock.
//!
//! ## Workers
//!
//! Refresh requests (startup, timer, manual) go through a bounded queue
//! consumed by a small worker pool. Manual triggers never block: a full
//! queue is reported back as [`SchedulerError::QueueFull`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use rates_types::{
    AutoUpdateStatus, CurrencyCode, RateFeed, RateRecord, RefreshOutcome, RefreshReport,
    RefreshTrigger, SchedulerError, SchedulerPhase,
};

use crate::repository::RateRepository;

/// Upper bound on the refresh worker pool.
pub const MAX_WORKERS: usize = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between automatic refreshes.
    pub period: Duration,
    /// Fire on multiples of `period` since the Unix epoch (top of the hour
    /// for an hourly period) instead of `period` after the last cycle.
    pub align_to_period: bool,
    /// Whether automatic refreshes are enabled at startup.
    pub auto_update: bool,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60 * 60),
            align_to_period: true,
            auto_update: true,
            workers: 2,
            queue_capacity: 8,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.period.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "refresh period must be greater than zero".into(),
            ));
        }
        if i64::try_from(self.period.as_millis()).is_err() {
            return Err(SchedulerError::InvalidConfig(format!(
                "refresh period is too large: {}s",
                self.period.as_secs()
            )));
        }
        if !(1..=MAX_WORKERS).contains(&self.workers) {
            return Err(SchedulerError::InvalidConfig(format!(
                "worker count must be between 1 and {}, got {}",
                MAX_WORKERS, self.workers
            )));
        }
        if self.queue_capacity == 0 {
            return Err(SchedulerError::InvalidConfig(
                "queue capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Delay until the next automatic refresh and its wall-clock time.
    fn next_fire(&self, now: DateTime<Utc>) -> (Duration, DateTime<Utc>) {
        let delay = if self.align_to_period {
            let period_ms = i64::try_from(self.period.as_millis())
                .unwrap_or(i64::MAX)
                .max(1);
            let now_ms = now.timestamp_millis();
            let next_ms = (now_ms.div_euclid(period_ms) + 1) * period_ms;
            Duration::from_millis((next_ms - now_ms) as u64)
        } else {
            self.period
        };

        (delay, add_duration(now, delay))
    }
}

fn add_duration(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Work items consumed by the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshRequest {
    Startup,
    Scheduled { timer_id: u64 },
    Manual,
}

impl RefreshRequest {
    fn trigger(self) -> RefreshTrigger {
        match self {
            RefreshRequest::Startup => RefreshTrigger::Startup,
            RefreshRequest::Scheduled { .. } => RefreshTrigger::Scheduled,
            RefreshRequest::Manual => RefreshTrigger::Manual,
        }
    }
}

/// The single pending automatic refresh.
struct ArmedTimer {
    id: u64,
    task: JoinHandle<()>,
    fires_at: DateTime<Utc>,
}

/// Counts a timer task as live until the task is dropped.
struct TimerGuard(Arc<AtomicUsize>);

impl TimerGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Refresh job state. `enabled == false` implies `timer == None`.
#[derive(Default)]
struct JobState {
    enabled: bool,
    timer: Option<ArmedTimer>,
    next_timer_id: u64,
    /// A startup or timer-driven cycle is executing.
    chain_running: bool,
    manual_in_flight: usize,
    stopped: bool,
    last_report: Option<RefreshReport>,
}

impl JobState {
    fn phase(&self) -> SchedulerPhase {
        if self.chain_running {
            SchedulerPhase::Running
        } else if self.timer.is_some() {
            SchedulerPhase::Armed
        } else {
            SchedulerPhase::Disabled
        }
    }

    fn in_flight(&self) -> usize {
        self.manual_in_flight + usize::from(self.chain_running)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.task.abort();
            debug!(timer_id = timer.id, "Refresh timer cancelled");
        }
    }
}

/// Snapshot of the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub phase: SchedulerPhase,
    pub next_run_at: Option<DateTime<Utc>>,
    pub in_flight: usize,
    /// Timer tasks that have not been dropped yet.
    pub live_timers: usize,
    pub last_report: Option<RefreshReport>,
}

impl From<SchedulerStatus> for AutoUpdateStatus {
    fn from(status: SchedulerStatus) -> Self {
        Self {
            enabled: status.enabled,
            phase: status.phase,
            next_run_at: status.next_run_at,
            in_flight: status.in_flight,
            last_report: status.last_report,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    config: SchedulerConfig,
    repo: RateRepository,
    feed: Arc<dyn RateFeed>,
    state: Mutex<JobState>,
    tx: mpsc::Sender<RefreshRequest>,
    rx: Mutex<Option<mpsc::Receiver<RefreshRequest>>>,
    shutdown_tx: broadcast::Sender<()>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    live_timers: Arc<AtomicUsize>,
}

/// Self-rescheduling background refresh of the rate table.
///
/// Cheap to clone; clones share the same job.
#[derive(Clone)]
pub struct RateRefreshScheduler {
    inner: Arc<Inner>,
}

impl RateRefreshScheduler {
    /// Creates a stopped scheduler. Call [`start`](Self::start) to run it.
    pub fn new(
        config: SchedulerConfig,
        repo: RateRepository,
        feed: Arc<dyn RateFeed>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = JobState {
            enabled: config.auto_update,
            ..JobState::default()
        };

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                repo,
                feed,
                state: Mutex::new(state),
                tx,
                rx: Mutex::new(Some(rx)),
                shutdown_tx,
                workers: Mutex::new(Vec::new()),
                live_timers: Arc::new(AtomicUsize::new(0)),
            }),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Spawns the worker pool and queues the startup refresh.
    ///
    /// The startup refresh runs whether or not auto-update is enabled.
    /// Calling `start` again is a no-op.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let Some(rx) = self.inner.rx.lock().take() else {
            warn!("Refresh scheduler already started");
            return Ok(());
        };

        {
            let mut state = self.inner.state.lock();
            if state.stopped {
                return Err(SchedulerError::Stopped);
            }
            self.inner
                .tx
                .try_send(RefreshRequest::Startup)
                .map_err(|_| SchedulerError::QueueFull)?;
            state.chain_running = true;
        }

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut workers = self.inner.workers.lock();
        for worker_id in 0..self.inner.config.workers {
            let inner = Arc::clone(&self.inner);
            let rx = Arc::clone(&rx);
            let shutdown_rx = self.inner.shutdown_tx.subscribe();
            workers.push(tokio::spawn(worker_loop(inner, rx, shutdown_rx, worker_id)));
        }

        info!(
            workers = self.inner.config.workers,
            period_secs = self.inner.config.period.as_secs(),
            auto_update = self.inner.config.auto_update,
            "Refresh scheduler started"
        );
        Ok(())
    }

    /// Queues a one-off refresh on the worker pool.
    ///
    /// Does not touch the automatic timer chain.
    pub fn trigger_refresh_now(&self) -> Result<(), SchedulerError> {
        if self.inner.state.lock().stopped {
            return Err(SchedulerError::Stopped);
        }

        self.inner
            .tx
            .try_send(RefreshRequest::Manual)
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SchedulerError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SchedulerError::Stopped,
            })?;

        info!("Manual refresh queued");
        Ok(())
    }

    /// Turns automatic refreshes on. One refresh runs right away.
    pub fn enable_auto_update(&self) -> Result<(), SchedulerError> {
        let mut state = self.inner.state.lock();
        if state.stopped {
            return Err(SchedulerError::Stopped);
        }
        if state.enabled {
            info!("Auto-update already enabled");
            return Ok(());
        }

        state.enabled = true;
        if state.chain_running {
            // The running cycle arms the next timer when it completes
            debug!("Auto-update enabled while a cycle is running");
        } else if state.timer.is_none() {
            self.inner.arm_timer(&mut state, Duration::ZERO);
        }

        info!("Auto-update enabled");
        Ok(())
    }

    /// Turns automatic refreshes off and cancels the pending timer.
    ///
    /// A cycle that is already running is left to finish.
    pub fn disable_auto_update(&self) {
        let mut state = self.inner.state.lock();
        if !state.enabled {
            info!("Auto-update already disabled");
            return;
        }

        state.enabled = false;
        state.cancel_timer();
        info!("Auto-update disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().enabled
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.inner.state.lock();
        SchedulerStatus {
            enabled: state.enabled,
            phase: state.phase(),
            next_run_at: state.timer.as_ref().map(|t| t.fires_at),
            in_flight: state.in_flight(),
            live_timers: self.inner.live_timers.load(Ordering::SeqCst),
            last_report: state.last_report.clone(),
        }
    }

    /// Stops the scheduler: cancels the timer, signals the workers and waits
    /// for them. A cycle in flight finishes first.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            state.stopped = true;
            state.enabled = false;
            state.cancel_timer();
        }

        let _ = self.inner.shutdown_tx.send(());

        let workers = std::mem::take(&mut *self.inner.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Refresh worker ended abnormally");
            }
        }

        info!("Refresh scheduler stopped");
    }
}

impl Inner {
    /// Arms the single automatic timer. Caller holds the state lock.
    fn arm_timer(&self, state: &mut JobState, delay: Duration) {
        state.cancel_timer();

        state.next_timer_id += 1;
        let timer_id = state.next_timer_id;
        let fires_at = add_duration(Utc::now(), delay);

        let tx = self.tx.clone();
        let guard = TimerGuard::new(Arc::clone(&self.live_timers));
        let task = tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            if tx.send(RefreshRequest::Scheduled { timer_id }).await.is_err() {
                debug!(timer_id, "Refresh queue closed before timer fired");
            }
        });

        debug!(timer_id, fires_at = %fires_at, "Refresh timer armed");
        state.timer = Some(ArmedTimer {
            id: timer_id,
            task,
            fires_at,
        });
    }

    /// Arms the next periodic timer.
    fn arm_next(&self, state: &mut JobState) {
        let (delay, _) = self.config.next_fire(Utc::now());
        self.arm_timer(state, delay);
    }

    /// Decides whether a dequeued request runs. Returns its trigger if so.
    fn claim(&self, request: RefreshRequest) -> Option<RefreshTrigger> {
        let mut state = self.state.lock();
        if state.stopped {
            debug!(?request, "Scheduler stopped, dropping request");
            return None;
        }

        match request {
            // `start` already marked the chain as running
            RefreshRequest::Startup => {}
            RefreshRequest::Scheduled { timer_id } => {
                let live = state.enabled && state.timer.as_ref().is_some_and(|t| t.id == timer_id);
                if !live {
                    debug!(timer_id, "Discarding request from a cancelled timer");
                    return None;
                }
                // The timer task has already fired; dropping its handle detaches it
                state.timer = None;
                state.chain_running = true;
            }
            RefreshRequest::Manual => state.manual_in_flight += 1,
        }

        Some(request.trigger())
    }

    /// Records a finished cycle and rearms the chain when due.
    fn complete(&self, report: RefreshReport) {
        let mut state = self.state.lock();

        if report.trigger == RefreshTrigger::Manual {
            state.manual_in_flight = state.manual_in_flight.saturating_sub(1);
        } else {
            state.chain_running = false;
            if state.enabled && !state.stopped && state.timer.is_none() {
                self.arm_next(&mut state);
            }
        }

        state.last_report = Some(report);
    }

    /// Runs one cycle in its own task so a panic cannot take the worker down.
    async fn run(&self, trigger: RefreshTrigger) -> RefreshReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        let repo = self.repo.clone();
        let feed = Arc::clone(&self.feed);
        let tally = match tokio::spawn(async move { refresh_cycle(&repo, feed.as_ref()).await }).await {
            Ok(tally) => tally,
            Err(e) => {
                error!(%run_id, error = %e, "Refresh cycle aborted");
                CycleTally::failed()
            }
        };

        let report = RefreshReport {
            run_id,
            trigger,
            outcome: tally.outcome,
            created: tally.created,
            updated: tally.updated,
            skipped: tally.skipped,
            failed: tally.failed,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        };

        info!(
            %run_id,
            trigger = ?report.trigger,
            outcome = ?report.outcome,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Refresh cycle finished"
        );
        report
    }

    async fn handle(&self, request: RefreshRequest) {
        let Some(trigger) = self.claim(request) else {
            return;
        };
        let report = self.run(trigger).await;
        self.complete(report);
    }
}

async fn worker_loop(
    inner: Arc<Inner>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<RefreshRequest>>>,
    mut shutdown_rx: broadcast::Receiver<()>,
    worker_id: usize,
) {
    debug!(worker_id, "Refresh worker started");

    loop {
        let request = tokio::select! {
            _ = shutdown_rx.recv() => break,
            request = async { rx.lock().await.recv().await } => match request {
                Some(request) => request,
                None => break,
            },
        };

        inner.handle(request).await;
    }

    debug!(worker_id, "Refresh worker exiting");
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh cycle
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CycleTally {
    outcome: RefreshOutcome,
    created: usize,
    updated: usize,
    skipped: usize,
    failed: usize,
}

impl CycleTally {
    fn empty(outcome: RefreshOutcome) -> Self {
        Self {
            outcome,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
        }
    }

    fn failed() -> Self {
        Self::empty(RefreshOutcome::Failed)
    }
}

/// Fetches the feed and reconciles every supported currency.
///
/// One bad quote or failed write never stops the others.
async fn refresh_cycle(repo: &RateRepository, feed: &dyn RateFeed) -> CycleTally {
    let quotes = feed.fetch_latest_rates().await;
    if quotes.is_empty() {
        warn!(feed = feed.name(), "No rates available from feed, skipping reconciliation");
        return CycleTally::empty(RefreshOutcome::NoData);
    }

    let mut tally = CycleTally::empty(RefreshOutcome::Completed);

    for &code in CurrencyCode::all() {
        let Some(quote) = quotes.get(code.code()).copied() else {
            debug!(code = %code, "No quote for currency");
            tally.skipped += 1;
            continue;
        };
        if quote <= Decimal::ZERO {
            warn!(code = %code, rate = %quote, "Ignoring non-positive quote");
            tally.skipped += 1;
            continue;
        }

        match reconcile(repo, code, quote).await {
            Ok(Reconciled::Created) => tally.created += 1,
            Ok(Reconciled::Updated) => tally.updated += 1,
            Ok(Reconciled::Rejected) => tally.skipped += 1,
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to reconcile rate");
                tally.failed += 1;
            }
        }
    }

    tally
}

enum Reconciled {
    Created,
    Updated,
    /// The quote rounds to a non-positive rate.
    Rejected,
}

async fn reconcile(
    repo: &RateRepository,
    code: CurrencyCode,
    quote: Decimal,
) -> Result<Reconciled, rates_types::RepoError> {
    let record = match RateRecord::new(code, quote) {
        Ok(record) => record,
        Err(e) => {
            warn!(code = %code, error = %e, "Ignoring unusable quote");
            return Ok(Reconciled::Rejected);
        }
    };

    let existed = repo.get(code).await?.is_some();
    repo.put(record).await?;

    Ok(if existed {
        Reconciled::Updated
    } else {
        Reconciled::Created
    })
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
