use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use taskmend::pool::TaskHandler;
use taskmend::task::Task;

/// A handler that always succeeds, echoing the task id.
pub struct OkHandler;

#[async_trait]
impl TaskHandler for OkHandler {
    async fn handle(&self, task: &Task) -> anyhow::Result<Value> {
        Ok(json!({ "handled": task.id }))
    }
}

/// A handler that always fails with the same error.
pub struct ErrHandler;

#[async_trait]
impl TaskHandler for ErrHandler {
    async fn handle(&self, _task: &Task) -> anyhow::Result<Value> {
        anyhow::bail!("simulated handler failure")
    }
}

/// A handler that fails a fixed number of times, then succeeds.
pub struct FlakyHandler {
    failures_before_success: u32,
    attempts: AtomicU32,
}

impl FlakyHandler {
    pub fn new(failures_before_success: u32) -> Self {
        Self {
            failures_before_success,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandler for FlakyHandler {
    async fn handle(&self, task: &Task) -> anyhow::Result<Value> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures_before_success {
            anyhow::bail!("flaky failure on attempt {}", attempt + 1)
        }
        Ok(json!({ "handled": task.id, "attempt": attempt + 1 }))
    }
}

/// A handler that panics, simulating an unhandled executor fault.
pub struct PanicHandler;

#[async_trait]
impl TaskHandler for PanicHandler {
    async fn handle(&self, _task: &Task) -> anyhow::Result<Value> {
        panic!("simulated executor fault")
    }
}

/// A handler that records the ids it sees, then succeeds.
pub struct RecordingHandler {
    seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    pub fn new(seen: Arc<Mutex<Vec<String>>>) -> Self {
        Self { seen }
    }
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn handle(&self, task: &Task) -> anyhow::Result<Value> {
        self.seen.lock().unwrap().push(task.id.clone());
        Ok(json!({ "handled": task.id }))
    }
}

/// A handler that sleeps before succeeding, for stalled-slot scenarios.
pub struct SlowHandler {
    delay: Duration,
}

impl SlowHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl TaskHandler for SlowHandler {
    async fn handle(&self, task: &Task) -> anyhow::Result<Value> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({ "handled": task.id }))
    }
}
