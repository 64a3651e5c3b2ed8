//! Explicit per-task outcome threaded through a slot chain.

use std::any::Any;

/// What happened when a slot ran one task.
#[derive(Debug)]
pub enum TaskOutcome<T, E> {
    /// The task produced a value.
    Completed(T),
    /// The task returned an error.
    Failed(E),
    /// The task panicked; the payload is rendered as text.
    Panicked(String),
}

impl<T, E> TaskOutcome<T, E> {
    /// Short label for the `outcome` log field.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Panicked(_) => "panicked",
        }
    }
}

impl<T, E> From<Result<T, E>> for TaskOutcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(error) => Self::Failed(error),
        }
    }
}

/// Render a panic payload captured by `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
