//! Background maintenance: bucket eviction and expired-state janitor.
//!
//! Both cadences run on one tokio task. Neither changes what callers observe
//! about live state; they bound memory. A zero interval disables its cadence,
//! and so does one too long to schedule.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::admission::AdmissionController;
use crate::detection::HotKeyDetector;
use crate::fallback::FallbackCache;

use super::HotKeyCascade;

/// Owner of the maintenance task. Dropping it leaves the task running until
/// the runtime shuts down; call [`shutdown`](Self::shutdown) to stop it.
pub struct MaintenanceHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Signal the task to stop and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Cascade maintenance task failed");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl HotKeyCascade {
    /// Spawn the maintenance task on the current tokio runtime.
    ///
    /// - every `bucket_reset_interval`: run the bucket eviction policy
    /// - every `cleanup_interval`: purge expired access records, hot flags and
    ///   fallback entries, then refresh gauges
    pub fn spawn_maintenance(&self) -> MaintenanceHandle {
        let detector = self.detector.clone();
        let admission = self.admission.clone();
        let fallback = self.fallback.clone();
        let reset_every = self.config.bucket_reset_interval();
        let cleanup_every = self.config.cleanup_interval();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut reset = ticker(reset_every);
            let mut cleanup = ticker(cleanup_every);
            info!(?reset_every, ?cleanup_every, "Cascade maintenance started");

            loop {
                tokio::select! {
                    _ = tick(&mut reset) => {
                        admission.evict();
                        crate::metrics::set_buckets(admission.bucket_count());
                    }
                    _ = tick(&mut cleanup) => {
                        run_janitor(&detector, &fallback, &admission);
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Cascade maintenance stopped");
        });

        MaintenanceHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

fn ticker(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let Some(start) = Instant::now().checked_add(period) else {
        warn!(?period, "Maintenance interval too long to schedule, cadence disabled");
        return None;
    };
    let mut interval = interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn run_janitor(detector: &Arc<HotKeyDetector>, fallback: &Arc<FallbackCache>, admission: &Arc<AdmissionController>) {
    let (records, flags) = detector.purge_expired();
    let entries = fallback.purge_expired();

    if records + flags + entries > 0 {
        debug!(records, flags, entries, "Purged expired cascade state");
    }
    crate::metrics::record_purge("access_records", records);
    crate::metrics::record_purge("hot_flags", flags);
    crate::metrics::record_purge("fallback_entries", entries);

    crate::metrics::set_hot_keys(detector.hot_keys().len());
    crate::metrics::set_tracked_keys(detector.tracked_keys());
    crate::metrics::set_fallback_entries(fallback.len());
    crate::metrics::set_buckets(admission.bucket_count());
}
