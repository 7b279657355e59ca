// src/pool/executor.rs

//! Executor slot state.

use std::time::{Duration, Instant};

/// State machine: Idle → Executing (on assignment) → Idle (outcome
/// recorded) or Failed (unhandled fault). Failed goes back to Idle only via
/// a health-monitor reset, never via task completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Executing,
    Failed,
}

/// A logical executor slot. Created once at pool start; reset in place on
/// failure rather than destroyed.
#[derive(Debug, Clone)]
pub struct Executor {
    pub id: usize,
    pub state: ExecutorState,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub total_execution_time: Duration,
    pub current_task: Option<String>,
    pub last_activity: Instant,
}

impl Executor {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            state: ExecutorState::Idle,
            tasks_completed: 0,
            tasks_failed: 0,
            total_execution_time: Duration::ZERO,
            current_task: None,
            last_activity: Instant::now(),
        }
    }

    /// Reset in place: back to idle with zeroed counters and no current
    /// task. Process-local state repair, not respawn.
    pub(crate) fn reset(&mut self) {
        self.state = ExecutorState::Idle;
        self.tasks_completed = 0;
        self.tasks_failed = 0;
        self.total_execution_time = Duration::ZERO;
        self.current_task = None;
        self.last_activity = Instant::now();
    }

    pub fn is_idle(&self) -> bool {
        self.state == ExecutorState::Idle
    }
}
