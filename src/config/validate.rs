// src/config/validate.rs

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{EngineError, Result};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = crate::errors::EngineError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(EngineConfig::new_unchecked(
            raw.pool,
            raw.health,
            raw.detector,
            raw.decomposer,
        ))
    }
}

fn validate_raw_config(cfg: &RawEngineConfig) -> Result<()> {
    validate_pool(cfg)?;
    validate_health(cfg)?;
    validate_detector(cfg)?;
    validate_decomposer(cfg)?;
    Ok(())
}

fn validate_pool(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.pool.size == 0 {
        return Err(EngineError::ConfigError(
            "[pool].size must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.pool.result_history == 0 {
        return Err(EngineError::ConfigError(
            "[pool].result_history must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_health(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.health.interval_ms == 0 {
        return Err(EngineError::ConfigError(
            "[health].interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.health.liveness_timeout_ms == 0 {
        return Err(EngineError::ConfigError(
            "[health].liveness_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_detector(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.detector.interval_ms == 0 {
        return Err(EngineError::ConfigError(
            "[detector].interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    for (name, value) in [
        ("memory_threshold", cfg.detector.memory_threshold),
        ("cpu_threshold", cfg.detector.cpu_threshold),
    ] {
        if !(value > 0.0 && value <= 100.0) {
            return Err(EngineError::ConfigError(format!(
                "[detector].{name} must be within (0, 100] (got {value})"
            )));
        }
    }
    if cfg.detector.history == 0 {
        return Err(EngineError::ConfigError(
            "[detector].history must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_decomposer(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.decomposer.length_threshold == 0 {
        return Err(EngineError::ConfigError(
            "[decomposer].length_threshold must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
