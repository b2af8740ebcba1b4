//! Fetch -> decode -> resolve -> reconcile, once per tick
//!
//! `Pipeline` is the single owner of the mapping store and the snapshot. The
//! HTTP layer only ever gets a `SnapshotView`. Cycles are spawned on a fixed
//! interval; a cycle that is still running when the next tick fires causes
//! that tick to be skipped rather than run concurrently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::events::{CycleReport, EventProcessor, ReconcileReport, SnapshotReconciler, SnapshotView};
use crate::feed::{FeedSource, FetchError, SynchronizedFetcher};

/// Counters for `/health`
#[derive(Debug, Default)]
pub struct CycleStats {
    pub cycles_completed: AtomicU64,
    pub cycles_skipped_busy: AtomicU64,
    pub cycles_failed: AtomicU64,
    pub events_accepted: AtomicU64,
    pub events_rejected: AtomicU64,
    /// Unix millis of the last completed cycle, 0 if none
    last_success_ms: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleStatsSummary {
    pub cycles_completed: u64,
    pub cycles_skipped_busy: u64,
    pub cycles_failed: u64,
    pub events_accepted: u64,
    pub events_rejected: u64,
    pub last_success: Option<DateTime<Utc>>,
}

impl CycleStats {
    fn record_success(&self, report: &CycleReport) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.events_accepted
            .fetch_add(report.events.len() as u64, Ordering::Relaxed);
        self.events_rejected
            .fetch_add(report.rejected.len() as u64, Ordering::Relaxed);
        self.last_success_ms
            .store(Utc::now().timestamp_millis().max(0) as u64, Ordering::Relaxed);
    }

    pub fn summary(&self) -> CycleStatsSummary {
        let last_ms = self.last_success_ms.load(Ordering::Relaxed);
        CycleStatsSummary {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped_busy: self.cycles_skipped_busy.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            last_success: (last_ms > 0)
                .then(|| DateTime::from_timestamp_millis(last_ms as i64))
                .flatten(),
        }
    }
}

/// Result of one `run_cycle` call
#[derive(Debug)]
pub enum CycleOutcome {
    Completed {
        cycle: CycleReport,
        reconcile: ReconcileReport,
    },
    /// Another cycle held the in-flight flag
    SkippedBusy,
    /// All fetch attempts failed; snapshot untouched
    FetchFailed(FetchError),
}

/// Clears the in-flight flag on drop, including on panic
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Pipeline<S: FeedSource> {
    fetcher: SynchronizedFetcher<S>,
    processor: EventProcessor,
    reconciler: SnapshotReconciler,
    in_flight: AtomicBool,
    stats: Arc<CycleStats>,
}

impl<S: FeedSource> Pipeline<S> {
    pub fn new(fetcher: SynchronizedFetcher<S>) -> Self {
        Self {
            fetcher,
            processor: EventProcessor::new(),
            reconciler: SnapshotReconciler::new(),
            in_flight: AtomicBool::new(false),
            stats: Arc::new(CycleStats::default()),
        }
    }

    pub fn snapshot(&self) -> SnapshotView {
        self.reconciler.view()
    }

    /// Run one full cycle unless another one is already in flight
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            self.stats.cycles_skipped_busy.fetch_add(1, Ordering::Relaxed);
            warn!("Previous cycle still in flight, skipping this tick");
            return CycleOutcome::SkippedBusy;
        };

        let started = Instant::now();

        let payload = match self.fetcher.fetch_synchronized().await {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.cycles_failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Polling cycle skipped");
                return CycleOutcome::FetchFailed(e);
            }
        };

        let cycle = self.processor.process(&payload);
        let reconcile = self.reconciler.update_state(cycle.events.clone());
        self.stats.record_success(&cycle);

        debug!(
            accepted = cycle.events.len(),
            rejected = cycle.rejected.len(),
            added = reconcile.added.len(),
            removed = reconcile.removed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cycle complete"
        );

        CycleOutcome::Completed { cycle, reconcile }
    }
}

/// Read-only status surface for the HTTP layer
pub trait PipelineStatus: Send + Sync {
    fn mapping_version(&self) -> u64;
    fn mapping_entries(&self) -> usize;
    fn mappings_updated_at(&self) -> Option<DateTime<Utc>>;
    fn stats_summary(&self) -> CycleStatsSummary;
    fn is_cycle_in_flight(&self) -> bool;
}

impl<S: FeedSource> PipelineStatus for Pipeline<S> {
    fn mapping_version(&self) -> u64 {
        self.processor.mappings().version()
    }

    fn mapping_entries(&self) -> usize {
        self.processor.mappings().entry_count()
    }

    fn mappings_updated_at(&self) -> Option<DateTime<Utc>> {
        self.processor.mappings().last_updated()
    }

    fn stats_summary(&self) -> CycleStatsSummary {
        self.stats.summary()
    }

    fn is_cycle_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl<S: FeedSource + 'static> Pipeline<S> {
    /// Trigger a cycle immediately and then every `every`, until `shutdown`
    /// flips to true. New cycles stop being scheduled on shutdown; the one in
    /// flight is awaited before returning.
    pub async fn run_polling(self: Arc<Self>, every: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = every.as_millis() as u64, "🔄 Starting feed polling");

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    cycles.retain(|handle| !handle.is_finished());
                    let pipeline = Arc::clone(&self);
                    cycles.push(tokio::spawn(async move {
                        pipeline.run_cycle().await;
                    }));
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Polling stopped, waiting for in-flight cycle");
        for handle in cycles {
            if let Err(e) = handle.await {
                error!(error = %e, "In-flight cycle task failed");
            }
        }
    }
}
