#![allow(dead_code)]

use taskmend::config::{
    DecomposerSection, DetectorSection, EngineConfig, HealthSection, PoolSection, RawEngineConfig,
};
use taskmend::task::{Task, TaskType};

/// Builder for `Task` to simplify test setup.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task: Task::new(task_type, 5),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.task.id = id.to_string();
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.task.priority = priority.clamp(1, 10);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.task = self.task.with_description(description);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.task.max_retries = max_retries;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Builder for `EngineConfig` with test-sized defaults: a pool of 2 and
/// short intervals, so suites never wait on production timing.
pub struct EngineConfigBuilder {
    raw: RawEngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        let raw = RawEngineConfig {
            pool: PoolSection {
                size: 2,
                max_retries: 3,
                result_history: 100,
            },
            health: HealthSection {
                interval_ms: 50,
                liveness_timeout_ms: 5_000,
            },
            // Background resource scans are effectively disabled (long
            // interval, unreachable thresholds) so suites only see the
            // issues they inject themselves.
            detector: DetectorSection {
                interval_ms: 60_000,
                memory_threshold: 100.0,
                cpu_threshold: 100.0,
                auto_fix: true,
                history: 50,
            },
            decomposer: DecomposerSection {
                length_threshold: 120,
            },
        };
        Self { raw }
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.raw.pool.size = size;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.raw.pool.max_retries = max_retries;
        self
    }

    pub fn auto_fix(mut self, auto_fix: bool) -> Self {
        self.raw.detector.auto_fix = auto_fix;
        self
    }

    pub fn liveness_timeout_ms(mut self, ms: u64) -> Self {
        self.raw.health.liveness_timeout_ms = ms;
        self
    }

    pub fn build(self) -> EngineConfig {
        EngineConfig::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
