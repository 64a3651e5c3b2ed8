//! Builder wiring configuration, callbacks, spawner and audit sink into a scheduler.

use std::fmt;
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::scheduler::{CompletedCallback, FailedCallback};
use crate::core::spawn::{erase, SpawnFn};
use crate::core::{AuditSink, Scheduler, SchedulerError, Spawn};

/// Builder for [`Scheduler`].
///
/// Without an explicit spawner, `build` uses the tokio runtime it is called
/// from (requires the `tokio-runtime` feature).
pub struct SchedulerBuilder<T, E = anyhow::Error> {
    config: SchedulerConfig,
    on_completed: Option<CompletedCallback<T>>,
    on_failed: Option<FailedCallback<E>>,
    audit: Option<Box<dyn AuditSink>>,
    spawner: Option<SpawnFn>,
}

impl<T, E> fmt::Debug for SchedulerBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerBuilder")
            .field("config", &self.config)
            .field("on_task_completed", &self.on_completed.is_some())
            .field("on_task_failed", &self.on_failed.is_some())
            .field("audit", &self.audit.is_some())
            .field("spawner", &self.spawner.is_some())
            .finish()
    }
}

impl<T, E> SchedulerBuilder<T, E> {
    /// Create a builder for a scheduler with `concurrency` slots.
    pub fn new(concurrency: usize) -> Self {
        Self::from_config(SchedulerConfig::new(concurrency))
    }

    /// Create a builder from an existing configuration.
    pub fn from_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            on_completed: None,
            on_failed: None,
            audit: None,
            spawner: None,
        }
    }

    /// Configuration the scheduler will be built with.
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Invoke `callback` with every successful task's value.
    #[must_use]
    pub fn on_task_completed<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_completed = Some(Arc::new(callback));
        self
    }

    /// Invoke `callback` with every failed task's error. When set, task errors
    /// no longer reach [`Scheduler::completion`].
    #[must_use]
    pub fn on_task_failed<F>(mut self, callback: F) -> Self
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        self.on_failed = Some(Arc::new(callback));
        self
    }

    /// Record scheduling decisions into `sink`.
    #[must_use]
    pub fn audit_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Some(Box::new(sink));
        self
    }

    /// Spawn slot chains with `spawner` instead of the ambient tokio runtime.
    #[must_use]
    pub fn spawner<S>(mut self, spawner: S) -> Self
    where
        S: Spawn + Send + Sync + 'static,
    {
        self.spawner = Some(erase(spawner));
        self
    }

    /// Build the scheduler.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::InvalidConcurrency`] if concurrency is 0
    /// - [`SchedulerError::NoRuntime`] if no spawner was given and no tokio
    ///   runtime is available
    pub fn build(self) -> Result<Scheduler<T, E>, SchedulerError> {
        self.config.validate()?;
        let spawner = match self.spawner {
            Some(spawner) => spawner,
            None => default_spawner()?,
        };
        Scheduler::from_parts(
            &self.config,
            self.on_completed,
            self.on_failed,
            self.audit,
            spawner,
        )
    }
}

#[cfg(feature = "tokio-runtime")]
fn default_spawner() -> Result<SpawnFn, SchedulerError> {
    crate::runtime::TokioSpawner::current().map(erase)
}

#[cfg(not(feature = "tokio-runtime"))]
fn default_spawner() -> Result<SpawnFn, SchedulerError> {
    Err(SchedulerError::NoRuntime(
        "no spawner configured and the tokio-runtime feature is disabled".into(),
    ))
}
