// src/pool/metrics.rs

//! Read-only monitoring snapshots for an external dashboard.

use serde::Serialize;

/// Point-in-time view of the executor pool.
///
/// `idle` is reported as `total - active`, so `active + idle == total` holds
/// at every snapshot; an executor parked in the failed state awaiting repair
/// still shows up through `ExecutorPool::executor_snapshots`.
#[derive(Debug, Clone, Serialize)]
pub struct PoolMetrics {
    pub total: usize,
    pub active: usize,
    pub idle: usize,
    pub queued: usize,
    pub completed: u64,
    pub failed: u64,
    pub avg_exec_ms: f64,
    pub uptime_s: f64,
}
