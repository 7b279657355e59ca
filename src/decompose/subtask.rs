// src/decompose/subtask.rs

//! Decomposition result types.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::{Task, TaskType};

/// One decomposition unit of a compound task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub subtask_id: String,
    pub parent_task_id: String,
    pub description: String,
    pub task_type: TaskType,
    pub priority: u8,
    pub estimated_duration: Duration,
    /// Sibling subtask ids this one requires.
    pub dependencies: BTreeSet<String>,
    pub can_parallelize: bool,
}

impl Subtask {
    /// Turn this subtask into an ordinary [`Task`] for the queue, carrying
    /// its ancestry in metadata.
    pub fn to_task(&self, decomposition_id: &str) -> Task {
        let mut task = Task::new(self.task_type, self.priority).with_description(&self.description);
        task.id = self.subtask_id.clone();
        task.metadata.insert(
            "parent_task_id".to_string(),
            Value::String(self.parent_task_id.clone()),
        );
        task.metadata.insert(
            "decomposition_id".to_string(),
            Value::String(decomposition_id.to_string()),
        );
        if !self.dependencies.is_empty() {
            task.metadata.insert(
                "dependencies".to_string(),
                Value::Array(
                    self.dependencies
                        .iter()
                        .map(|d| Value::String(d.clone()))
                        .collect(),
                ),
            );
        }
        task
    }
}

/// A compound task split into dependency-ordered subtasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDecomposition {
    pub decomposition_id: String,
    pub task: Task,
    pub subtasks: Vec<Subtask>,
    /// subtask_id → ids it requires.
    pub dependency_graph: BTreeMap<String, BTreeSet<String>>,
    /// Topologically ordered parallel groups; every subtask appears in
    /// exactly one group and all its dependencies sit in earlier groups.
    pub execution_order: Vec<Vec<String>>,
    /// Critical-path style estimate: the sum over groups of the largest
    /// duration within each group.
    pub total_estimated_duration: Duration,
}

impl TaskDecomposition {
    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.subtask_id == subtask_id)
    }
}
