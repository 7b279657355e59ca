// src/pool/handler.rs

//! Pluggable task handler abstraction.
//!
//! The pool talks to handlers through [`TaskHandler`] instead of hard-wired
//! functions. This is the seam where all business logic plugs in: the engine
//! routes by task type and never interprets payloads itself. Tests provide
//! fakes that succeed, fail, or panic on demand.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::task::{Task, TaskType};

/// Trait implemented by anything that can execute a task.
///
/// A returned `Err` counts against the task's retry budget; a panic parks
/// the executor as failed until the health monitor resets it.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &Task) -> anyhow::Result<Value>;
}

/// Maps task types to their handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskType, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task_type: TaskType, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(task_type, handler);
    }

    /// Fluent variant for building a registry inline.
    pub fn with(mut self, task_type: TaskType, handler: Arc<dyn TaskHandler>) -> Self {
        self.register(task_type, handler);
        self
    }

    pub fn get(&self, task_type: TaskType) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(&task_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<TaskType> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}
