// Background worker: every refresh_interval_secs, evict expired cache entries, recompute the
// rest, and push each entry whose buckets changed. Stops when the shutdown channel fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::cache::RefreshOutcome;
use crate::models::{AggregationUpdate, LiveEvent, METRICS_UPDATE_TOPIC};
use crate::sample_repo::SampleStore;
use crate::service::MetricsService;

/// Config for the refresh worker.
#[derive(Debug, Clone)]
pub struct RefreshWorkerConfig {
    pub refresh_interval_secs: u64,
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub evicted: usize,
    /// Recomputed with different buckets; one push each.
    pub refreshed: usize,
    pub unchanged: usize,
    /// Recomputation failed; entry kept and flagged stale.
    pub failed: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Spawns the refresh worker. Returns a join handle that completes after shutdown.
pub fn spawn<S: SampleStore>(
    service: Arc<MetricsService<S>>,
    config: RefreshWorkerConfig,
    shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(service, config, shutdown_rx).await;
    })
}

#[instrument(skip(service, shutdown_rx), fields(interval_secs = config.refresh_interval_secs))]
async fn run<S: SampleStore>(
    service: Arc<MetricsService<S>>,
    config: RefreshWorkerConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let period = Duration::from_secs(config.refresh_interval_secs);
    // first cycle after one full interval: a just-started cache has nothing to refresh
    let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let report = run_cycle(&service, Utc::now()).await;
                if report.is_idle() {
                    debug!("refresh cycle: nothing to do");
                } else {
                    let stats = service.cache().stats();
                    info!(
                        evicted = report.evicted,
                        refreshed = report.refreshed,
                        unchanged = report.unchanged,
                        failed = report.failed,
                        cache_entries = stats.entries,
                        cache_hits = stats.hits,
                        cache_misses = stats.misses,
                        "refresh cycle"
                    );
                }
            }
            _ = &mut shutdown_rx => {
                debug!("Refresh worker shutting down");
                break;
            }
        }
    }
}

/// One sweep + recompute pass. Never fails: a key whose recomputation errors is logged,
/// marked stale, and skipped.
pub async fn run_cycle<S: SampleStore>(
    service: &MetricsService<S>,
    now: DateTime<Utc>,
) -> CycleReport {
    let cache = service.cache();
    let mut report = CycleReport {
        evicted: cache.sweep_expired(now).len(),
        ..CycleReport::default()
    };

    for key in cache.keys() {
        let buckets = match service.compute(key.query()).await {
            Ok(b) => b,
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "refresh_entry",
                    name = %key.query().name,
                    "cache entry recomputation failed; keeping stale entry"
                );
                cache.mark_stale(&key);
                report.failed += 1;
                continue;
            }
        };

        match cache.apply_refresh(&key, buckets.clone(), now) {
            RefreshOutcome::Changed => {
                service.sink().publish(
                    METRICS_UPDATE_TOPIC,
                    LiveEvent::Aggregation(AggregationUpdate { key, buckets }),
                );
                report.refreshed += 1;
            }
            RefreshOutcome::Unchanged => report.unchanged += 1,
            // evicted concurrently; nothing to update or announce
            RefreshOutcome::Missing => {}
        }
    }

    report
}
