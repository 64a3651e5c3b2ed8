//! # Task Throttle
//!
//! A bounded-concurrency task scheduler for throttling batches of asynchronous
//! operations, such as uploading many files or issuing many parallel API calls,
//! without overrunning the downstream service.
//!
//! ## Model
//!
//! - **Slots**: at most `concurrency` tasks execute at any instant
//! - **Backlog**: everything else waits in a single FIFO, claimed in submission order
//! - **Chains**: each slot loops, claiming the next backlog entry the moment its
//!   current task settles, and ends once it observes an empty backlog
//! - **Fire-and-forget submission**: `add` returns nothing; outcomes go to the
//!   optional `on_task_completed` / `on_task_failed` callbacks
//! - **Completion barrier**: `completion()` resolves when every live chain has drained
//!
//! ## Example
//!
//! ```rust,ignore
//! use task_throttle::core::Scheduler;
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::<&'static str>::builder(2)
//!     .on_task_completed(|result| println!("task finished: {result}"))
//!     .on_task_failed(|err| eprintln!("task failed: {err}"))
//!     .build()?;
//!
//! scheduler.add(|| async {
//!     tokio::time::sleep(Duration::from_millis(1000)).await;
//!     Ok("Task 1")
//! });
//! scheduler.add(|| async {
//!     tokio::time::sleep(Duration::from_millis(500)).await;
//!     Ok("Task 2")
//! });
//!
//! scheduler.completion().await?;
//! ```
//!
//! A scheduler stays usable after it drains: a later `add` reopens a slot.
//!
//! For complete examples, see:
//! - `tests/scheduler_test.rs` - Scheduling scenarios
//! - `tests/failure_test.rs` - Failure and panic propagation

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and slot bookkeeping.
pub mod core;
/// Configuration models for schedulers.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Runtime adapters for spawning slot chains.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::SchedulerBuilder;
pub use crate::config::SchedulerConfig;
pub use crate::core::{Scheduler, SchedulerError, SchedulerStats, TaskFailure};
