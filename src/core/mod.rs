//! Core scheduling abstractions and slot bookkeeping.

pub mod audit;
pub mod error;
pub mod outcome;
pub mod scheduler;
pub mod spawn;
pub mod stats;

/// Identifier assigned to each task at submission, starting at 0.
pub type TaskId = u64;

/// Index of a slot, in `0..concurrency`.
pub type SlotId = usize;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, build_audit_event};
pub use error::{AppResult, SchedulerError, TaskFailure};
pub use outcome::TaskOutcome;
pub use scheduler::Scheduler;
pub use spawn::Spawn;
pub use stats::SchedulerStats;
