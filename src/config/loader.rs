// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawEngineConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (ranges, non-zero pool size, etc.). Use [`load_and_validate`]
/// for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawEngineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawEngineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks value ranges (pool size, thresholds, intervals).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw_config = load_from_path(&path)?;
    let config = EngineConfig::try_from(raw_config)?;
    Ok(config)
}

/// Helper to resolve a default config path.
///
/// Respects the `TASKMEND_CONFIG` env var, falling back to `Taskmend.toml`
/// in the current working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var("TASKMEND_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("Taskmend.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let cfg = load_and_validate(file.path()).unwrap();
        assert_eq!(cfg.pool.size, 300);
        assert_eq!(cfg.pool.max_retries, 3);
        assert_eq!(cfg.detector.interval_ms, 30_000);
        assert!(cfg.detector.auto_fix);
    }

    #[test]
    fn sections_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[pool]\nsize = 4\n\n[detector]\nmemory_threshold = 80.0\nauto_fix = false\n"
        )
        .unwrap();

        let cfg = load_and_validate(file.path()).unwrap();
        assert_eq!(cfg.pool.size, 4);
        assert_eq!(cfg.detector.memory_threshold, 80.0);
        assert!(!cfg.detector.auto_fix);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.health.interval_ms, 5_000);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_and_validate("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, crate::errors::EngineError::IoError(_)));
    }
}
