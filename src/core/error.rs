//! Error types for scheduler construction and task outcomes.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::{SlotId, TaskId};

/// Errors produced while configuring or constructing a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Concurrency must be a positive integer.
    #[error("invalid concurrency: {0} (must be greater than 0)")]
    InvalidConcurrency(usize),
    /// Configuration could not be parsed or loaded.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No runtime is available to spawn slot chains on.
    #[error("no runtime available: {0}")]
    NoRuntime(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// An unhandled task failure, surfaced through [`Scheduler::completion`].
///
/// Task errors only reach this type when no `on_task_failed` callback is
/// configured. Panics always do, since there is no error value to hand to the
/// callback.
///
/// [`Scheduler::completion`]: crate::core::Scheduler::completion
#[derive(Debug)]
pub enum TaskFailure<E> {
    /// The task returned an error.
    Failed {
        /// Task that failed.
        task: TaskId,
        /// Slot the task ran in.
        slot: SlotId,
        /// The error returned by the task.
        error: Arc<E>,
    },
    /// The task, or one of the outcome callbacks, panicked.
    Panicked {
        /// Task that panicked.
        task: TaskId,
        /// Slot the task ran in.
        slot: SlotId,
        /// Panic payload rendered as text.
        message: String,
    },
    /// The slot chain was dropped before it finished draining, which happens
    /// when the runtime shuts down underneath it.
    Aborted {
        /// Slot whose chain was dropped.
        slot: SlotId,
    },
}

impl<E> TaskFailure<E> {
    /// Task identifier, if the failure belongs to a specific task.
    pub const fn task(&self) -> Option<TaskId> {
        match self {
            Self::Failed { task, .. } | Self::Panicked { task, .. } => Some(*task),
            Self::Aborted { .. } => None,
        }
    }

    /// Slot the failure happened in.
    pub const fn slot(&self) -> SlotId {
        match self {
            Self::Failed { slot, .. } | Self::Panicked { slot, .. } | Self::Aborted { slot } => *slot,
        }
    }

    /// The task's own error, if this failure carries one.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Failed { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

// Manual impl: `E` itself does not need to be `Clone`.
impl<E> Clone for TaskFailure<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Failed { task, slot, error } => Self::Failed {
                task: *task,
                slot: *slot,
                error: Arc::clone(error),
            },
            Self::Panicked {
                task,
                slot,
                message,
            } => Self::Panicked {
                task: *task,
                slot: *slot,
                message: message.clone(),
            },
            Self::Aborted { slot } => Self::Aborted { slot: *slot },
        }
    }
}

impl<E: fmt::Display> fmt::Display for TaskFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { task, slot, error } => {
                write!(f, "task {task} failed in slot {slot}: {error}")
            }
            Self::Panicked {
                task,
                slot,
                message,
            } => write!(f, "task {task} panicked in slot {slot}: {message}"),
            Self::Aborted { slot } => write!(f, "slot {slot} was dropped before draining"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TaskFailure<E> {}
