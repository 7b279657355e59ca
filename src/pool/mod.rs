// src/pool/mod.rs

//! Executor pool.
//!
//! - [`core`] owns the pool itself: the dispatch loop, retry handling and
//!   the result history.
//! - [`executor`] defines the per-slot state machine.
//! - [`handler`] is the pluggable [`TaskHandler`] seam and its registry.
//! - [`metrics`] holds the read-only monitoring snapshot types.

pub mod core;
pub mod executor;
pub mod handler;
pub mod metrics;

pub use core::ExecutorPool;
pub use executor::{Executor, ExecutorState};
pub use handler::{HandlerRegistry, TaskHandler};
pub use metrics::PoolMetrics;
