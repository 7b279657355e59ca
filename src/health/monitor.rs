// src/health/monitor.rs

//! Executor liveness monitoring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::HealthSection;
use crate::pool::ExecutorPool;

/// Periodically scans the pool and resets failed or unresponsive executors
/// in place. This is process-local state repair, not process respawn.
pub struct HealthMonitor {
    pool: Arc<ExecutorPool>,
    cfg: HealthSection,
    running: AtomicBool,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ExecutorPool>, cfg: HealthSection) -> Self {
        Self {
            pool,
            cfg,
            running: AtomicBool::new(false),
        }
    }

    /// Run a single repair scan. Exposed so tests and diagnostics can step
    /// the monitor without the background loop.
    pub fn repair_cycle(&self) -> usize {
        let timeout = Duration::from_millis(self.cfg.liveness_timeout_ms);
        let repaired = self.pool.repair_unhealthy(timeout);
        if repaired > 0 {
            debug!(repaired, "health monitor repaired executors");
        }
        repaired
    }

    /// Spawn the background monitor loop.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = self;
        monitor.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            info!(interval_ms = monitor.cfg.interval_ms, "health monitor started");
            let mut interval =
                tokio::time::interval(Duration::from_millis(monitor.cfg.interval_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; consume it so the first real
            // scan happens one interval in.
            interval.tick().await;

            while monitor.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if !monitor.running.load(Ordering::SeqCst) {
                    break;
                }
                monitor.repair_cycle();
            }

            info!("health monitor stopped");
        })
    }

    /// Stop the monitor loop after its current sleep.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("interval_ms", &self.cfg.interval_ms)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}
