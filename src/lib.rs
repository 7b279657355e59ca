// src/lib.rs

//! taskmend — a self-healing, priority-aware task scheduling engine.
//!
//! Work items go in through the [`PriorityDispatcher`]; compound ones are
//! split by the [`TaskDecomposer`] into dependency-ordered subtasks; a fixed
//! [`ExecutorPool`] drains one shared priority queue; the [`HealthMonitor`]
//! resets dead executors in place; and the [`IssueDetector`] turns observed
//! system trouble into new remediation tasks on the same queue.

pub mod config;
pub mod decompose;
pub mod dispatch;
pub mod errors;
pub mod health;
pub mod logging;
pub mod pool;
pub mod task;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

pub use config::EngineConfig;
pub use decompose::{Subtask, TaskDecomposer, TaskDecomposition};
pub use dispatch::{DispatcherStatus, PriorityDispatcher, TaskQueue};
pub use errors::{EngineError, Result};
pub use health::{DetectedIssue, HealthMonitor, IssueCategory, IssueDetector, IssueSeverity};
pub use pool::{ExecutorPool, HandlerRegistry, PoolMetrics, TaskHandler};
pub use task::{priority, Task, TaskResult, TaskType};

/// High-level wiring of the whole engine.
///
/// This ties together, exactly once and with no hidden globals:
/// - the shared task queue
/// - the decomposer + dispatcher
/// - the executor pool
/// - the health monitor
/// - the issue detector
pub struct Engine {
    queue: Arc<TaskQueue>,
    dispatcher: Arc<PriorityDispatcher>,
    pool: Arc<ExecutorPool>,
    monitor: Arc<HealthMonitor>,
    detector: Arc<IssueDetector>,
    started: AtomicBool,
}

impl Engine {
    /// Build an engine from a validated config and a handler registry.
    pub fn new(config: EngineConfig, handlers: HandlerRegistry) -> Self {
        let queue = Arc::new(TaskQueue::new());
        let decomposer = Arc::new(TaskDecomposer::new(config.decomposer.clone()));
        let dispatcher = Arc::new(PriorityDispatcher::new(
            Arc::clone(&queue),
            Some(decomposer),
        ));
        let pool = Arc::new(ExecutorPool::new(
            config.pool.clone(),
            Arc::clone(&queue),
            handlers,
        ));
        let monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&pool),
            config.health.clone(),
        ));
        let detector = Arc::new(
            IssueDetector::new(config.detector.clone()).with_pool(Arc::clone(&pool)),
        );

        Self {
            queue,
            dispatcher,
            pool,
            monitor,
            detector,
            started: AtomicBool::new(false),
        }
    }

    /// Launch the pool dispatch loop, the health monitor and the issue
    /// detector. Calling twice is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("engine starting");
        self.pool.start();
        Arc::clone(&self.monitor).start();
        Arc::clone(&self.detector).start();
    }

    /// Stop all loops and refuse further submissions.
    pub fn shutdown(&self) {
        info!("engine shutting down");
        self.detector.stop();
        self.monitor.stop();
        self.pool.shutdown();
    }

    pub fn dispatcher(&self) -> &PriorityDispatcher {
        &self.dispatcher
    }

    pub fn pool(&self) -> Arc<ExecutorPool> {
        Arc::clone(&self.pool)
    }

    pub fn detector(&self) -> Arc<IssueDetector> {
        Arc::clone(&self.detector)
    }

    pub fn monitor(&self) -> Arc<HealthMonitor> {
        Arc::clone(&self.monitor)
    }

    pub fn queue(&self) -> Arc<TaskQueue> {
        Arc::clone(&self.queue)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("started", &self.started.load(Ordering::SeqCst))
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
