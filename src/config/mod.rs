// src/config/mod.rs

//! Engine configuration.
//!
//! - [`model`] holds the serde structures mapped from the TOML file.
//! - [`loader`] reads and validates a config file from disk.
//! - [`validate`] turns a [`RawEngineConfig`] into a checked
//!   [`EngineConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    DecomposerSection, DetectorSection, EngineConfig, HealthSection, PoolSection, RawEngineConfig,
};
