// src/dispatch/mod.rs

//! Task intake and the shared pending queue.
//!
//! - [`queue`] holds the priority-ordered [`TaskQueue`] every producer
//!   feeds and the pool drains.
//! - [`dispatcher`] is the caller-facing [`PriorityDispatcher`] with the
//!   typed convenience constructors and capability routing tables.

pub mod dispatcher;
pub mod queue;

pub use dispatcher::{DispatcherStatus, PriorityDispatcher};
pub use queue::TaskQueue;
