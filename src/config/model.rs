// src/config/model.rs

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [pool]
/// size = 300
/// max_retries = 3
///
/// [health]
/// interval_ms = 5000
///
/// [detector]
/// interval_ms = 30000
/// memory_threshold = 90.0
/// cpu_threshold = 95.0
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEngineConfig {
    /// Executor pool knobs from `[pool]`.
    #[serde(default)]
    pub pool: PoolSection,

    /// Health-monitor knobs from `[health]`.
    #[serde(default)]
    pub health: HealthSection,

    /// Issue-detector knobs from `[detector]`.
    #[serde(default)]
    pub detector: DetectorSection,

    /// Decomposer knobs from `[decomposer]`.
    #[serde(default)]
    pub decomposer: DecomposerSection,
}

/// `[pool]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSection {
    /// Number of logical executors created at pool start.
    #[serde(default = "default_pool_size")]
    pub size: usize,

    /// Default retry budget for tasks that do not set their own.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// How many task results to keep in the bounded history.
    #[serde(default = "default_result_history")]
    pub result_history: usize,
}

fn default_pool_size() -> usize {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_result_history() -> usize {
    1000
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
            max_retries: default_max_retries(),
            result_history: default_result_history(),
        }
    }
}

/// `[health]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthSection {
    /// How often the monitor scans the executor registry.
    #[serde(default = "default_health_interval_ms")]
    pub interval_ms: u64,

    /// An executor silent for longer than this while executing is treated
    /// as unresponsive and reset.
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,
}

fn default_health_interval_ms() -> u64 {
    5_000
}

fn default_liveness_timeout_ms() -> u64 {
    60_000
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            interval_ms: default_health_interval_ms(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
        }
    }
}

/// `[detector]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSection {
    /// Scan-cycle interval. Deliberately long; the scans themselves are
    /// cheap but each cycle can enqueue remediation work.
    #[serde(default = "default_detector_interval_ms")]
    pub interval_ms: u64,

    /// Used-memory percentage above which a `memory_high` issue is raised.
    #[serde(default = "default_memory_threshold")]
    pub memory_threshold: f32,

    /// CPU percentage above which a `cpu_high` issue is raised.
    #[serde(default = "default_cpu_threshold")]
    pub cpu_threshold: f32,

    /// Whether detected issues are pushed into the pool as remediation
    /// tasks automatically.
    #[serde(default = "default_auto_fix")]
    pub auto_fix: bool,

    /// How many issues to keep in the bounded history.
    #[serde(default = "default_issue_history")]
    pub history: usize,
}

fn default_detector_interval_ms() -> u64 {
    30_000
}

fn default_memory_threshold() -> f32 {
    90.0
}

fn default_cpu_threshold() -> f32 {
    95.0
}

fn default_auto_fix() -> bool {
    true
}

fn default_issue_history() -> usize {
    500
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            interval_ms: default_detector_interval_ms(),
            memory_threshold: default_memory_threshold(),
            cpu_threshold: default_cpu_threshold(),
            auto_fix: default_auto_fix(),
            history: default_issue_history(),
        }
    }
}

/// `[decomposer]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DecomposerSection {
    /// Description length beyond which a task counts as complex even
    /// without conjunction markers.
    #[serde(default = "default_length_threshold")]
    pub length_threshold: usize,
}

fn default_length_threshold() -> usize {
    120
}

impl Default for DecomposerSection {
    fn default() -> Self {
        Self {
            length_threshold: default_length_threshold(),
        }
    }
}

/// Validated engine configuration.
///
/// Constructed via `TryFrom<RawEngineConfig>` (see `config::validate`), or
/// [`EngineConfig::default`] for the all-defaults case, which is valid by
/// construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pool: PoolSection,
    pub health: HealthSection,
    pub detector: DetectorSection,
    pub decomposer: DecomposerSection,
}

impl EngineConfig {
    /// Construct without re-running validation. Callers outside
    /// `config::validate` should use `TryFrom<RawEngineConfig>`.
    pub(crate) fn new_unchecked(
        pool: PoolSection,
        health: HealthSection,
        detector: DetectorSection,
        decomposer: DecomposerSection,
    ) -> Self {
        Self {
            pool,
            health,
            detector,
            decomposer,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new_unchecked(
            PoolSection::default(),
            HealthSection::default(),
            DetectorSection::default(),
            DecomposerSection::default(),
        )
    }
}
