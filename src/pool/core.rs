// src/pool/core.rs

//! The executor pool: a fixed set of logical executors draining the shared
//! priority queue.
//!
//! One background dispatch loop pops tasks and assigns them to idle
//! executors, parking on notifications when the queue is empty or every
//! executor is busy. Each assignment runs in its own Tokio task so a slow
//! handler stalls only its slot. Executors are non-preemptible: a handler
//! runs to completion before the slot is freed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::PoolSection;
use crate::dispatch::TaskQueue;
use crate::errors::{EngineError, Result};
use crate::health::issue::{DetectedIssue, IssueSeverity};
use crate::pool::executor::{Executor, ExecutorState};
use crate::pool::handler::HandlerRegistry;
use crate::pool::metrics::PoolMetrics;
use crate::task::{priority, Task, TaskResult, TaskType};

/// Fixed-size pool of homogeneous executors.
pub struct ExecutorPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    queue: Arc<TaskQueue>,
    handlers: HandlerRegistry,
    executors: Mutex<Vec<Executor>>,
    results: Mutex<VecDeque<TaskResult>>,
    result_history: usize,
    default_max_retries: u32,
    /// Signalled whenever an executor returns to idle (including via a
    /// health-monitor reset).
    executor_freed: Notify,
    shutdown: AtomicBool,
    /// Tasks that reached a successful completion.
    completed: AtomicU64,
    /// Tasks that exhausted their retry budget.
    failed: AtomicU64,
    started_at: Instant,
}

impl PoolInner {
    fn executors_locked(&self) -> MutexGuard<'_, Vec<Executor>> {
        self.executors.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn results_locked(&self) -> MutexGuard<'_, VecDeque<TaskResult>> {
        self.results.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Linear scan for an idle executor; claims it for `task_id` if found.
    fn try_claim_idle(&self, task_id: &str) -> Option<usize> {
        let mut executors = self.executors_locked();
        for ex in executors.iter_mut() {
            if ex.is_idle() {
                ex.state = ExecutorState::Executing;
                ex.current_task = Some(task_id.to_string());
                ex.last_activity = Instant::now();
                return Some(ex.id);
            }
        }
        None
    }

    fn record_result(&self, result: TaskResult) {
        let mut results = self.results_locked();
        results.push_back(result);
        while results.len() > self.result_history {
            results.pop_front();
        }
    }
}

/// Outcome of one handler invocation.
enum Attempt {
    Success(serde_json::Value),
    /// The handler returned an error; counts against the retry budget.
    HandlerError(String),
    /// The handler panicked; the executor is parked as failed.
    Fault(String),
}

impl ExecutorPool {
    pub fn new(cfg: PoolSection, queue: Arc<TaskQueue>, handlers: HandlerRegistry) -> Self {
        let executors = (0..cfg.size).map(Executor::new).collect();
        Self {
            inner: Arc::new(PoolInner {
                queue,
                handlers,
                executors: Mutex::new(executors),
                results: Mutex::new(VecDeque::new()),
                result_history: cfg.result_history,
                default_max_retries: cfg.max_retries,
                executor_freed: Notify::new(),
                shutdown: AtomicBool::new(false),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                started_at: Instant::now(),
            }),
        }
    }

    /// Spawn the background dispatch loop.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(dispatch_loop(inner))
    }

    /// Halt the dispatch loop and refuse further submissions. Idempotent;
    /// already-running handlers finish their current task.
    pub fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("executor pool shutting down");
        self.inner.queue.close();
        self.inner.executor_freed.notify_waiters();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    /// Submit a pre-built task onto the shared queue.
    pub fn submit_task(&self, task: Task) -> Result<String> {
        let id = task.id.clone();
        debug!(task = %id, task_type = %task.task_type, priority = task.priority, "pool submission");
        if !self.inner.queue.push(task) {
            return Err(EngineError::QueueClosed);
        }
        Ok(id)
    }

    // --- Typed submission helpers -------------------------------------

    pub fn submit_fix_task(&self, description: &str, prio: u8) -> Result<String> {
        self.submit_typed(TaskType::Fix, description, prio)
    }

    pub fn submit_code_task(&self, description: &str, prio: u8) -> Result<String> {
        self.submit_typed(TaskType::Code, description, prio)
    }

    pub fn submit_analyze_task(&self, description: &str, prio: u8) -> Result<String> {
        self.submit_typed(TaskType::Analyze, description, prio)
    }

    pub fn submit_repair_task(&self, description: &str, prio: u8) -> Result<String> {
        self.submit_typed(TaskType::Repair, description, prio)
    }

    pub fn submit_optimize_task(&self, description: &str, prio: u8) -> Result<String> {
        self.submit_typed(TaskType::Optimize, description, prio)
    }

    pub fn submit_monitor_task(&self, description: &str, prio: u8) -> Result<String> {
        self.submit_typed(TaskType::Monitor, description, prio)
    }

    pub fn submit_heal_task(&self, description: &str, prio: u8) -> Result<String> {
        self.submit_typed(TaskType::Heal, description, prio)
    }

    fn submit_typed(&self, task_type: TaskType, description: &str, prio: u8) -> Result<String> {
        let mut task = Task::new(task_type, prio).with_description(description);
        task.max_retries = self.inner.default_max_retries;
        self.submit_task(task)
    }

    /// Convert a detected issue into the matching remediation submission.
    ///
    /// Priority derives from severity; unrecognized issue types fall back to
    /// a generic heal submission.
    pub fn handle_system_issue(&self, issue: &DetectedIssue) -> Result<String> {
        let prio = match issue.severity {
            IssueSeverity::Critical => priority::CRITICAL,
            IssueSeverity::High => priority::HIGH,
            _ => priority::MEDIUM,
        };
        let description = format!("{}: {}", issue.issue_type, issue.description);

        match issue.issue_type.as_str() {
            "memory_high" | "memory_issue" => self.submit_heal_task(&description, prio),
            "cpu_high" => self.submit_optimize_task(&description, prio),
            "import_error" | "syntax_error" | "type_error" | "encoding_error" => {
                self.submit_fix_task(&description, prio)
            }
            "connection_error" | "port_conflict" | "timeout_error" => {
                self.submit_repair_task(&description, prio)
            }
            other => {
                debug!(issue_type = other, "no dedicated remediation; submitting generic heal");
                self.submit_heal_task(&description, prio)
            }
        }
    }

    /// Reset every failed or unresponsive executor in place.
    ///
    /// An executor counts as unresponsive when it has been executing without
    /// any activity for longer than `liveness_timeout`. Returns how many
    /// executors were reset.
    pub fn repair_unhealthy(&self, liveness_timeout: Duration) -> usize {
        let mut repaired = 0;
        {
            let mut executors = self.inner.executors_locked();
            for ex in executors.iter_mut() {
                let unresponsive = ex.state == ExecutorState::Executing
                    && ex.last_activity.elapsed() > liveness_timeout;
                if ex.state == ExecutorState::Failed || unresponsive {
                    warn!(
                        executor = ex.id,
                        state = ?ex.state,
                        current_task = ?ex.current_task,
                        "resetting executor in place"
                    );
                    ex.reset();
                    repaired += 1;
                }
            }
        }
        if repaired > 0 {
            self.inner.executor_freed.notify_waiters();
        }
        repaired
    }

    /// Fault-injection hook for diagnostics and tests: park an executor in
    /// the failed state as if its handler had faulted.
    pub fn force_fail_executor(&self, executor_id: usize) -> bool {
        let mut executors = self.inner.executors_locked();
        match executors.get_mut(executor_id) {
            Some(ex) => {
                ex.state = ExecutorState::Failed;
                ex.tasks_failed += 1;
                true
            }
            None => false,
        }
    }

    pub fn metrics(&self) -> PoolMetrics {
        let executors = self.inner.executors_locked();
        let total = executors.len();
        let active = executors
            .iter()
            .filter(|e| e.state == ExecutorState::Executing)
            .count();

        let attempts: u64 = executors
            .iter()
            .map(|e| e.tasks_completed + e.tasks_failed)
            .sum();
        let exec_time: Duration = executors.iter().map(|e| e.total_execution_time).sum();
        let avg_exec_ms = if attempts == 0 {
            0.0
        } else {
            exec_time.as_secs_f64() * 1000.0 / attempts as f64
        };

        PoolMetrics {
            total,
            active,
            idle: total - active,
            queued: self.inner.queue.len(),
            completed: self.inner.completed.load(Ordering::SeqCst),
            failed: self.inner.failed.load(Ordering::SeqCst),
            avg_exec_ms,
            uptime_s: self.inner.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Clone of the executor registry for diagnostics.
    pub fn executor_snapshots(&self) -> Vec<Executor> {
        self.inner.executors_locked().clone()
    }

    /// Most recent results, oldest first.
    pub fn recent_results(&self, n: usize) -> Vec<TaskResult> {
        let results = self.inner.results_locked();
        let skip = results.len().saturating_sub(n);
        results.iter().skip(skip).cloned().collect()
    }

    /// Every archived result for a given task id, in attempt order.
    pub fn results_for(&self, task_id: &str) -> Vec<TaskResult> {
        self.inner
            .results_locked()
            .iter()
            .filter(|r| r.task_id == task_id)
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for ExecutorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let metrics = self.metrics();
        f.debug_struct("ExecutorPool")
            .field("total", &metrics.total)
            .field("active", &metrics.active)
            .field("queued", &metrics.queued)
            .finish_non_exhaustive()
    }
}

/// Background loop: pop tasks, claim idle executors, spawn executions.
async fn dispatch_loop(inner: Arc<PoolInner>) {
    info!("executor pool dispatch loop started");

    loop {
        let Some(task) = inner.queue.next_task().await else {
            break;
        };

        let Some(executor_id) = claim_when_available(&inner, &task).await else {
            debug!(task = %task.id, "pool shut down while waiting for an executor; dropping task");
            break;
        };

        let exec_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            execute(exec_inner, executor_id, task).await;
        });
    }

    info!("executor pool dispatch loop finished");
}

/// Wait until an idle executor can be claimed; `None` on shutdown.
async fn claim_when_available(inner: &Arc<PoolInner>, task: &Task) -> Option<usize> {
    loop {
        if inner.shutdown.load(Ordering::SeqCst) {
            return None;
        }
        let freed = inner.executor_freed.notified();
        if let Some(id) = inner.try_claim_idle(&task.id) {
            return Some(id);
        }
        freed.await;
    }
}

/// Run one task on an already-claimed executor.
async fn execute(inner: Arc<PoolInner>, executor_id: usize, mut task: Task) {
    let started = Instant::now();

    let attempt = match inner.handlers.get(task.task_type) {
        Some(handler) => {
            let task_for_handler = task.clone();
            // Handler runs in its own task so a panic is contained as a
            // JoinError instead of tearing down the dispatch machinery.
            let join = tokio::spawn(async move { handler.handle(&task_for_handler).await }).await;
            match join {
                Ok(Ok(value)) => Attempt::Success(value),
                Ok(Err(err)) => Attempt::HandlerError(err.to_string()),
                Err(join_err) => Attempt::Fault(join_err.to_string()),
            }
        }
        None => Attempt::HandlerError(format!(
            "no handler registered for task type '{}'",
            task.task_type
        )),
    };
    let elapsed = started.elapsed();

    let (success, result, error) = match &attempt {
        Attempt::Success(value) => (true, Some(value.clone()), None),
        Attempt::HandlerError(err) | Attempt::Fault(err) => (false, None, Some(err.clone())),
    };

    inner.record_result(TaskResult {
        task_id: task.id.clone(),
        executor_id,
        task_type: task.task_type,
        success,
        result,
        error,
        execution_time: elapsed,
        timestamp: Utc::now(),
    });

    let faulted = matches!(&attempt, Attempt::Fault(_));
    {
        let mut executors = inner.executors_locked();
        if let Some(ex) = executors.get_mut(executor_id) {
            ex.last_activity = Instant::now();
            ex.total_execution_time += elapsed;
            if success {
                ex.tasks_completed += 1;
            } else {
                ex.tasks_failed += 1;
            }
            if faulted {
                ex.state = ExecutorState::Failed;
                warn!(
                    executor = executor_id,
                    task = %task.id,
                    "handler fault; executor parked as failed until repaired"
                );
            } else {
                ex.state = ExecutorState::Idle;
                ex.current_task = None;
            }
        }
    }

    match attempt {
        Attempt::Success(_) => {
            inner.completed.fetch_add(1, Ordering::SeqCst);
            debug!(task = %task.id, executor = executor_id, "task completed");
        }
        Attempt::HandlerError(err) | Attempt::Fault(err) => {
            task.retry_count += 1;
            if task.retry_count <= task.max_retries {
                debug!(
                    task = %task.id,
                    retry = task.retry_count,
                    max_retries = task.max_retries,
                    error = %err,
                    "task failed; re-enqueueing"
                );
                if !inner.queue.push(task) {
                    warn!("queue closed; dropping retry");
                }
            } else {
                inner.failed.fetch_add(1, Ordering::SeqCst);
                warn!(
                    task = %task.id,
                    attempts = task.retry_count,
                    error = %err,
                    "task permanently failed"
                );
            }
        }
    }

    // A faulted executor stays parked; only the health monitor frees it.
    if !faulted {
        inner.executor_freed.notify_one();
    }
}
