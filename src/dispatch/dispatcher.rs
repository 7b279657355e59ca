// src/dispatch/dispatcher.rs

//! Priority-aware task intake.
//!
//! The dispatcher is the front door for callers: it routes compound tasks
//! through the decomposer, pushes everything onto the shared [`TaskQueue`],
//! and keeps a bounded history of dispatched ids for diagnostics. It never
//! validates subtask dependencies against what was actually submitted; that
//! contract stays with the caller.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info};

use crate::decompose::TaskDecomposer;
use crate::dispatch::queue::TaskQueue;
use crate::errors::{EngineError, Result};
use crate::task::{priority, Task, TaskType};

const DISPATCH_HISTORY_LIMIT: usize = 1000;

/// Read-only snapshot for an external dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatus {
    pub pending_count: usize,
    pub history_size: usize,
    pub route_table_sizes: (usize, usize),
}

/// Routes incoming tasks onto the shared priority queue, decomposing
/// compound ones first.
pub struct PriorityDispatcher {
    queue: Arc<TaskQueue>,
    /// Optional decomposer; without one every task is dispatched as-is.
    decomposer: Option<Arc<TaskDecomposer>>,
    history: Mutex<VecDeque<String>>,
    tier_routing: HashMap<String, TaskType>,
    aem_routing: HashMap<String, TaskType>,
}

impl PriorityDispatcher {
    pub fn new(queue: Arc<TaskQueue>, decomposer: Option<Arc<TaskDecomposer>>) -> Self {
        Self {
            queue,
            decomposer,
            history: Mutex::new(VecDeque::new()),
            tier_routing: default_tier_routing(),
            aem_routing: default_aem_routing(),
        }
    }

    fn history_locked(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, id: &str) {
        let mut history = self.history_locked();
        history.push_back(id.to_string());
        while history.len() > DISPATCH_HISTORY_LIMIT {
            history.pop_front();
        }
    }

    /// Dispatch a task.
    ///
    /// Compound tasks (see [`TaskDecomposer::is_complex`]) are decomposed
    /// and every subtask is enqueued as an ordinary task, group by group in
    /// execution order; the returned id is then `"decomposed:<parent_id>"`.
    /// Plain tasks are enqueued directly and return their own id.
    pub fn dispatch(&self, task: Task) -> Result<String> {
        if let Some(decomposer) = &self.decomposer {
            if decomposer.is_complex(&task) {
                return self.dispatch_decomposed(decomposer, task);
            }
        }

        let id = task.id.clone();
        debug!(task = %id, task_type = %task.task_type, priority = task.priority, "dispatching task");
        if !self.queue.push(task) {
            return Err(EngineError::QueueClosed);
        }
        self.record(&id);
        Ok(id)
    }

    fn dispatch_decomposed(&self, decomposer: &TaskDecomposer, task: Task) -> Result<String> {
        let parent_id = task.id.clone();
        let decomposition = decomposer.decompose_task(&task, &HashMap::new())?;

        info!(
            task = %parent_id,
            subtasks = decomposition.subtasks.len(),
            groups = decomposition.execution_order.len(),
            "dispatching decomposed task"
        );

        // Enqueue in execution order; earlier groups carry numerically lower
        // priorities, so the queue preserves the intended ordering.
        for group in &decomposition.execution_order {
            for subtask_id in group {
                let Some(subtask) = decomposition.subtask(subtask_id) else {
                    continue;
                };
                let child = subtask.to_task(&decomposition.decomposition_id);
                if !self.queue.push(child) {
                    return Err(EngineError::QueueClosed);
                }
            }
        }

        let id = format!("decomposed:{parent_id}");
        self.record(&id);
        Ok(id)
    }

    /// Pop the most urgent pending task, if any.
    pub fn get_next_task(&self) -> Option<Task> {
        self.queue.pop()
    }

    // --- Typed convenience constructors -------------------------------

    pub fn dispatch_fix(&self, description: &str) -> Result<String> {
        self.dispatch_typed(TaskType::Fix, description, priority::MEDIUM)
    }

    pub fn dispatch_code(&self, description: &str) -> Result<String> {
        self.dispatch_typed(TaskType::Code, description, priority::MEDIUM)
    }

    pub fn dispatch_analyze(&self, description: &str) -> Result<String> {
        self.dispatch_typed(TaskType::Analyze, description, priority::MEDIUM)
    }

    pub fn dispatch_repair(&self, description: &str) -> Result<String> {
        self.dispatch_typed(TaskType::Repair, description, priority::MEDIUM)
    }

    pub fn dispatch_optimize(&self, description: &str) -> Result<String> {
        self.dispatch_typed(TaskType::Optimize, description, priority::MEDIUM)
    }

    pub fn dispatch_monitor(&self, description: &str) -> Result<String> {
        self.dispatch_typed(TaskType::Monitor, description, priority::MEDIUM)
    }

    /// Healing work defaults to the most urgent priority level.
    pub fn dispatch_heal(&self, description: &str) -> Result<String> {
        self.dispatch_typed(TaskType::Heal, description, priority::CRITICAL)
    }

    fn dispatch_typed(&self, task_type: TaskType, description: &str, prio: u8) -> Result<String> {
        self.dispatch(Task::new(task_type, prio).with_description(description))
    }

    // --- Named-capability routing -------------------------------------

    /// Resolve a tier capability name to a task type and dispatch.
    pub fn dispatch_tier(&self, capability: &str, description: &str) -> Result<String> {
        let task_type = self
            .tier_routing
            .get(capability)
            .copied()
            .ok_or_else(|| EngineError::UnknownCapability(capability.to_string()))?;
        self.dispatch_typed(task_type, description, priority::MEDIUM)
    }

    /// Resolve an AEM capability name to a task type and dispatch.
    pub fn dispatch_aem(&self, capability: &str, description: &str) -> Result<String> {
        let task_type = self
            .aem_routing
            .get(capability)
            .copied()
            .ok_or_else(|| EngineError::UnknownCapability(capability.to_string()))?;
        self.dispatch_typed(task_type, description, priority::MEDIUM)
    }

    pub fn register_tier_route(&mut self, capability: impl Into<String>, task_type: TaskType) {
        self.tier_routing.insert(capability.into(), task_type);
    }

    pub fn register_aem_route(&mut self, capability: impl Into<String>, task_type: TaskType) {
        self.aem_routing.insert(capability.into(), task_type);
    }

    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            pending_count: self.queue.len(),
            history_size: self.history_locked().len(),
            route_table_sizes: (self.tier_routing.len(), self.aem_routing.len()),
        }
    }

    /// Recent dispatched ids, newest last.
    pub fn recent_dispatches(&self, n: usize) -> Vec<String> {
        let history = self.history_locked();
        history.iter().rev().take(n).rev().cloned().collect()
    }
}

impl std::fmt::Debug for PriorityDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityDispatcher")
            .field("pending", &self.queue.len())
            .field("has_decomposer", &self.decomposer.is_some())
            .finish_non_exhaustive()
    }
}

fn default_tier_routing() -> HashMap<String, TaskType> {
    HashMap::from([
        ("code_patch".to_string(), TaskType::Fix),
        ("code_generation".to_string(), TaskType::Code),
        ("diagnostics".to_string(), TaskType::Analyze),
        ("self_heal".to_string(), TaskType::Heal),
    ])
}

fn default_aem_routing() -> HashMap<String, TaskType> {
    HashMap::from([
        ("remediation".to_string(), TaskType::Repair),
        ("tuning".to_string(), TaskType::Optimize),
        ("watchdog".to_string(), TaskType::Monitor),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> PriorityDispatcher {
        PriorityDispatcher::new(Arc::new(TaskQueue::new()), None)
    }

    #[test]
    fn priority_then_fifo_through_dispatcher() {
        let d = dispatcher();
        let fix = Task::new(TaskType::Fix, 1).with_description("urgent fix");
        let analyze = Task::new(TaskType::Analyze, 5).with_description("routine analysis");
        d.dispatch(fix).unwrap();
        d.dispatch(analyze).unwrap();

        let first = d.get_next_task().unwrap();
        assert_eq!(first.task_type, TaskType::Fix);
        let second = d.get_next_task().unwrap();
        assert_eq!(second.task_type, TaskType::Analyze);
        assert!(d.get_next_task().is_none());
    }

    #[test]
    fn heal_defaults_to_critical_priority() {
        let d = dispatcher();
        d.dispatch_analyze("look around").unwrap();
        d.dispatch_heal("restart the widget").unwrap();

        // Heal was submitted second but pops first.
        let first = d.get_next_task().unwrap();
        assert_eq!(first.task_type, TaskType::Heal);
        assert_eq!(first.priority, priority::CRITICAL);
    }

    #[test]
    fn unknown_capability_is_an_error() {
        let d = dispatcher();
        let err = d.dispatch_tier("no_such_capability", "x").unwrap_err();
        assert!(matches!(err, EngineError::UnknownCapability(_)));
    }

    #[test]
    fn capability_routing_resolves_types() {
        let mut d = dispatcher();
        d.register_tier_route("linting", TaskType::Analyze);

        d.dispatch_tier("linting", "lint the tree").unwrap();
        assert_eq!(
            d.get_next_task().map(|t| t.task_type),
            Some(TaskType::Analyze)
        );

        d.dispatch_aem("remediation", "reconnect").unwrap();
        assert_eq!(
            d.get_next_task().map(|t| t.task_type),
            Some(TaskType::Repair)
        );
    }

    #[test]
    fn status_reflects_queue_and_history() {
        let d = dispatcher();
        d.dispatch_fix("one").unwrap();
        d.dispatch_fix("two").unwrap();

        let status = d.status();
        assert_eq!(status.pending_count, 2);
        assert_eq!(status.history_size, 2);
        assert_eq!(status.route_table_sizes, (4, 3));
    }

    #[test]
    fn dispatch_after_close_fails() {
        let queue = Arc::new(TaskQueue::new());
        let d = PriorityDispatcher::new(Arc::clone(&queue), None);
        queue.close();
        assert!(matches!(
            d.dispatch_fix("too late"),
            Err(EngineError::QueueClosed)
        ));
    }
}
