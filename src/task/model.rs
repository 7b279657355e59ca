// src/task/model.rs

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Named priority levels on the 1 (highest) … 10 (lowest) scale.
pub mod priority {
    pub const CRITICAL: u8 = 1;
    pub const HIGH: u8 = 3;
    pub const MEDIUM: u8 = 5;
    pub const LOW: u8 = 8;
}

/// Kind of work a task represents.
///
/// Handlers are registered per type; the engine itself never interprets the
/// payload beyond routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Fix,
    Code,
    Analyze,
    Repair,
    Optimize,
    Monitor,
    Heal,
    Custom,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Fix => "fix",
            TaskType::Code => "code",
            TaskType::Analyze => "analyze",
            TaskType::Repair => "repair",
            TaskType::Optimize => "optimize",
            TaskType::Monitor => "monitor",
            TaskType::Heal => "heal",
            TaskType::Custom => "custom",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fix" => Ok(TaskType::Fix),
            "code" => Ok(TaskType::Code),
            "analyze" => Ok(TaskType::Analyze),
            "repair" => Ok(TaskType::Repair),
            "optimize" => Ok(TaskType::Optimize),
            "monitor" => Ok(TaskType::Monitor),
            "heal" => Ok(TaskType::Heal),
            "custom" => Ok(TaskType::Custom),
            other => Err(format!("invalid task type: {other}")),
        }
    }
}

/// A submitted unit of work.
///
/// `timeout_ms` is advisory metadata only; handlers are trusted to bound
/// themselves and the engine never preempts a running handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub priority: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

impl Task {
    /// Create a task of the given type with a fresh id and default knobs.
    pub fn new(task_type: TaskType, priority: u8) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_type,
            payload: Map::new(),
            priority: priority.clamp(1, 10),
            timeout_ms: default_timeout_ms(),
            retry_count: 0,
            max_retries: default_max_retries(),
            created_at: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// Convenience for the common one-line payload.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.payload
            .insert("description".to_string(), Value::String(description.into()));
        self
    }

    /// The free-text the decomposer and classifiers work from: the
    /// `description` payload entry if present, otherwise every string value
    /// in the payload joined in key order.
    pub fn description_text(&self) -> String {
        if let Some(Value::String(s)) = self.payload.get("description") {
            return s.clone();
        }
        self.payload
            .values()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of one execution attempt, archived in the pool's result history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub executor_id: usize,
    pub task_type: TaskType,
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub execution_time: Duration,
    pub timestamp: DateTime<Utc>,
}

impl TaskResult {
    pub fn execution_time_ms(&self) -> f64 {
        self.execution_time.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_round_trips_through_str() {
        for ty in [
            TaskType::Fix,
            TaskType::Code,
            TaskType::Analyze,
            TaskType::Repair,
            TaskType::Optimize,
            TaskType::Monitor,
            TaskType::Heal,
            TaskType::Custom,
        ] {
            assert_eq!(ty.as_str().parse::<TaskType>(), Ok(ty));
        }
        assert!("garbage".parse::<TaskType>().is_err());
    }

    #[test]
    fn new_task_clamps_priority() {
        assert_eq!(Task::new(TaskType::Fix, 0).priority, 1);
        assert_eq!(Task::new(TaskType::Fix, 200).priority, 10);
        assert_eq!(Task::new(TaskType::Fix, 5).priority, 5);
    }

    #[test]
    fn description_text_prefers_description_key() {
        let task = Task::new(TaskType::Code, 5).with_description("build the thing");
        assert_eq!(task.description_text(), "build the thing");
    }

    #[test]
    fn description_text_falls_back_to_payload_strings() {
        let mut task = Task::new(TaskType::Code, 5);
        task.payload
            .insert("a".into(), Value::String("first".into()));
        task.payload.insert("b".into(), Value::Number(7.into()));
        task.payload
            .insert("c".into(), Value::String("second".into()));
        assert_eq!(task.description_text(), "first second");
    }
}
