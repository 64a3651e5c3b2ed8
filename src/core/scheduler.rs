//! Bounded-concurrency scheduler.
//!
//! A scheduler owns a FIFO backlog and at most `concurrency` slot chains. A
//! chain runs one task at a time and, every time a task settles, claims the
//! next backlog entry in the same loop iteration. When it observes an empty
//! backlog it ends. Backlog, live-chain count and failure bookkeeping share one
//! `parking_lot::Mutex`, so "backlog empty, chain ends" and "fewer than
//! `concurrency` chains live, open one" are decided atomically with respect to
//! each other and no submission is stranded.
//!
//! # Unhandled failures
//!
//! A *busy period* runs from the moment the first chain opens on an idle
//! scheduler until the last live chain ends. The first unhandled failure of a
//! busy period is sticky: later ones are logged and counted but do not replace
//! it, and draining always continues. [`Scheduler::completion`] reports it.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::audit::{build_audit_event, AuditAction, AuditSink};
use super::error::{SchedulerError, TaskFailure};
use super::outcome::{panic_message, TaskOutcome};
use super::spawn::SpawnFn;
use super::stats::{SchedulerCounters, SchedulerStats};
use super::{SlotId, TaskId};
use crate::builders::SchedulerBuilder;
use crate::config::SchedulerConfig;

/// Callback invoked with each successful task's value.
pub(crate) type CompletedCallback<T> = Arc<dyn Fn(T) + Send + Sync>;
/// Callback invoked with each failed task's error.
pub(crate) type FailedCallback<E> = Arc<dyn Fn(E) + Send + Sync>;

type BoxedTask<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;
type Waiter<E> = oneshot::Sender<Result<(), TaskFailure<E>>>;

struct QueuedTask<T, E> {
    id: TaskId,
    run: BoxedTask<T, E>,
}

/// Everything guarded by the scheduler lock.
struct SlotState<T, E> {
    backlog: VecDeque<QueuedTask<T, E>>,
    /// Busy flag per slot index.
    busy: Vec<bool>,
    live: usize,
    /// First unhandled failure of the current busy period.
    failure: Option<TaskFailure<E>>,
    /// Outcome of the most recent finished busy period.
    last_outcome: Result<(), TaskFailure<E>>,
    waiters: Vec<Waiter<E>>,
}

struct Inner<T, E> {
    id: Uuid,
    concurrency: usize,
    state: Mutex<SlotState<T, E>>,
    counters: SchedulerCounters,
    next_task_id: AtomicU64,
    on_completed: Option<CompletedCallback<T>>,
    on_failed: Option<FailedCallback<E>>,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
    spawner: SpawnFn,
}

/// Bounded-concurrency scheduler for asynchronous tasks.
///
/// Tasks are zero-argument closures returning a future of `Result<T, E>`.
/// At most `concurrency` of them execute at once; the rest wait in a FIFO
/// backlog and are claimed in submission order. Outcomes are delivered through
/// the optional callbacks; [`completion`](Self::completion) is the barrier.
///
/// Cloning a scheduler yields another handle to the same slots and backlog.
///
/// # Example
///
/// ```rust,ignore
/// use task_throttle::core::Scheduler;
///
/// let scheduler = Scheduler::<String>::builder(2)
///     .on_task_completed(|name| println!("uploaded {name}"))
///     .on_task_failed(|err| eprintln!("upload failed: {err}"))
///     .build()?;
///
/// for file in files {
///     scheduler.add(move || async move { upload(&file).await });
/// }
///
/// scheduler.completion().await?;
/// ```
pub struct Scheduler<T, E = anyhow::Error> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for Scheduler<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Scheduler<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.inner.id)
            .field("concurrency", &self.inner.concurrency)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<T, E> Scheduler<T, E> {
    /// Start building a scheduler with the given number of slots.
    pub fn builder(concurrency: usize) -> SchedulerBuilder<T, E> {
        SchedulerBuilder::new(concurrency)
    }

    pub(crate) fn from_parts(
        config: &SchedulerConfig,
        on_completed: Option<CompletedCallback<T>>,
        on_failed: Option<FailedCallback<E>>,
        audit: Option<Box<dyn AuditSink>>,
        spawner: SpawnFn,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let inner = Inner {
            id: Uuid::new_v4(),
            concurrency: config.concurrency,
            state: Mutex::new(SlotState {
                backlog: VecDeque::new(),
                busy: vec![false; config.concurrency],
                live: 0,
                failure: None,
                last_outcome: Ok(()),
                waiters: Vec::new(),
            }),
            counters: SchedulerCounters::default(),
            next_task_id: AtomicU64::new(0),
            on_completed,
            on_failed,
            audit: audit.map(Mutex::new),
            spawner,
        };
        info!(
            scheduler = %inner.id,
            concurrency = inner.concurrency,
            "scheduler initialized"
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Instance id used in logs and audit events.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Maximum number of simultaneously executing tasks.
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Snapshot of the scheduler's counters.
    pub fn stats(&self) -> SchedulerStats {
        self.inner.counters.snapshot(self.inner.concurrency)
    }

    /// Returns true if no chain is live and the backlog is empty.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.live == 0 && state.backlog.is_empty()
    }

    /// Wait until every slot chain opened so far has drained.
    ///
    /// Resolves immediately on an idle scheduler, with the outcome of the most
    /// recent busy period (or `Ok` if no task was ever added). Otherwise it
    /// resolves when the last live chain ends.
    ///
    /// Dropping the returned future (for example under a timeout) is cheap:
    /// its registration is discarded by the next `completion` call.
    ///
    /// # Errors
    ///
    /// Returns the first unhandled [`TaskFailure`] of the busy period: a task
    /// error when no `on_task_failed` callback is configured, or any panic.
    /// A chain dropped mid-flight reports [`TaskFailure::Aborted`] with the
    /// slot it ran in.
    pub async fn completion(&self) -> Result<(), TaskFailure<E>> {
        let waiter = {
            let mut state = self.inner.state.lock();
            if state.live == 0 {
                return state.last_outcome.clone();
            }
            state.waiters.retain(|waiter| !waiter.is_canceled());
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            rx
        };
        match waiter.await {
            Ok(outcome) => outcome,
            // Sender dropped unsent: fall back to whatever the last close recorded.
            Err(oneshot::Canceled) => self.inner.state.lock().last_outcome.clone(),
        }
    }
}

#[cfg(feature = "tokio-runtime")]
impl<T, E> Scheduler<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    /// Create a scheduler without callbacks on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or no tokio runtime is running.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        SchedulerBuilder::from_config(config).build()
    }

    /// Shorthand for [`Scheduler::new`] with only a concurrency.
    ///
    /// # Errors
    ///
    /// Fails if `concurrency` is zero or no tokio runtime is running.
    pub fn with_concurrency(concurrency: usize) -> Result<Self, SchedulerError> {
        Self::new(SchedulerConfig::new(concurrency))
    }
}

impl<T, E> Scheduler<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    /// Submit a task.
    ///
    /// Starts it right away if fewer than `concurrency` chains are live,
    /// otherwise appends it to the backlog. The outcome is delivered through
    /// the configured callbacks, never through this call.
    ///
    /// Entries stranded by chains dropped mid-flight (runtime shutdown) stay
    /// ahead of the new task. The next `add` opens as many chains as there
    /// are free slots and backlog entries, and the new task starts only once
    /// the older entries have been claimed.
    pub fn add<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let inner = &self.inner;
        let id = inner.next_task_id.fetch_add(1, Ordering::Relaxed);
        inner.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        let run: BoxedTask<T, E> = Box::new(move || task().boxed());

        let mut claimed = Vec::new();
        {
            let mut state = inner.state.lock();
            state.backlog.push_back(QueuedTask { id, run });
            inner.counters.queued_tasks.fetch_add(1, Ordering::Relaxed);

            while state.live < inner.concurrency && !state.backlog.is_empty() {
                let slot = inner.open_slot(&mut state);
                if let Some(first) = inner.claim_front(&mut state, slot) {
                    claimed.push((slot, first));
                }
            }

            // The new task is the tail, so it is still queued iff the backlog is not empty.
            if !state.backlog.is_empty() {
                inner.record(Some(id), None, AuditAction::Enqueued, None);
                debug!(
                    scheduler = %inner.id,
                    task_id = id,
                    queued = state.backlog.len(),
                    "all slots busy, task enqueued"
                );
            }
        }

        for (slot, first) in claimed {
            inner.spawn_chain(slot, first);
        }
    }
}

impl<T, E> Inner<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    fn spawn_chain(self: &Arc<Self>, slot: SlotId, first: QueuedTask<T, E>) {
        let chain = ChainGuard {
            inner: Arc::clone(self),
            slot,
            finished: false,
        };
        (self.spawner)(Box::pin(chain.run(first)));
    }

    async fn execute(&self, slot: SlotId, task: QueuedTask<T, E>) -> TaskOutcome<T, E> {
        let QueuedTask { id, run } = task;
        let _active = ActiveTask::new(&self.counters.active_tasks);
        debug!(scheduler = %self.id, task_id = id, slot, "executing task");

        match AssertUnwindSafe(async move { run().await })
            .catch_unwind()
            .await
        {
            Ok(result) => result.into(),
            Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
        }
    }

    /// Deliver an outcome to the callbacks; returns it if nothing absorbed it.
    fn dispatch(
        &self,
        task: TaskId,
        slot: SlotId,
        outcome: TaskOutcome<T, E>,
    ) -> Option<TaskFailure<E>> {
        debug!(scheduler = %self.id, task_id = task, slot, outcome = outcome.label(), "task settled");
        match outcome {
            TaskOutcome::Completed(value) => {
                self.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                self.record(Some(task), Some(slot), AuditAction::Completed, None);
                let callback = self.on_completed.as_ref()?;
                Self::invoke(task, slot, "on_task_completed", || callback(value))
            }
            TaskOutcome::Failed(error) => {
                self.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                let detail = error.to_string();
                self.record(
                    Some(task),
                    Some(slot),
                    AuditAction::Failed,
                    Some(detail.clone()),
                );
                if let Some(callback) = self.on_failed.as_ref() {
                    debug!(scheduler = %self.id, task_id = task, slot, error = %detail, "task failed");
                    Self::invoke(task, slot, "on_task_failed", || callback(error))
                } else {
                    warn!(
                        scheduler = %self.id,
                        task_id = task,
                        slot,
                        error = %detail,
                        "task failed with no on_task_failed callback"
                    );
                    Some(TaskFailure::Failed {
                        task,
                        slot,
                        error: Arc::new(error),
                    })
                }
            }
            TaskOutcome::Panicked(message) => {
                self.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                self.record(
                    Some(task),
                    Some(slot),
                    AuditAction::Failed,
                    Some(message.clone()),
                );
                warn!(scheduler = %self.id, task_id = task, slot, panic = %message, "task panicked");
                Some(TaskFailure::Panicked {
                    task,
                    slot,
                    message,
                })
            }
        }
    }

    fn invoke(
        task: TaskId,
        slot: SlotId,
        name: &str,
        callback: impl FnOnce(),
    ) -> Option<TaskFailure<E>> {
        std::panic::catch_unwind(AssertUnwindSafe(callback))
            .err()
            .map(|payload| {
                let message = format!("{name} callback panicked: {}", panic_message(payload.as_ref()));
                warn!(task_id = task, slot, panic = %message, "outcome callback panicked");
                TaskFailure::Panicked {
                    task,
                    slot,
                    message,
                }
            })
    }
}

impl<T, E> Inner<T, E> {
    fn open_slot(&self, state: &mut SlotState<T, E>) -> SlotId {
        let slot = state.busy.iter().position(|busy| !busy).unwrap_or(state.live);
        if let Some(flag) = state.busy.get_mut(slot) {
            *flag = true;
        }
        state.live += 1;
        if state.live == 1 {
            state.failure = None;
        }
        self.counters.live_slots.fetch_add(1, Ordering::Relaxed);
        self.record(None, Some(slot), AuditAction::SlotOpened, None);
        info!(scheduler = %self.id, slot, live = state.live, "slot chain opened");
        slot
    }

    /// Pop the backlog front for `slot`; the start is recorded under the lock.
    fn claim_front(&self, state: &mut SlotState<T, E>, slot: SlotId) -> Option<QueuedTask<T, E>> {
        let task = state.backlog.pop_front()?;
        self.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
        self.counters.started_tasks.fetch_add(1, Ordering::Relaxed);
        self.record(Some(task.id), Some(slot), AuditAction::Started, None);
        debug!(
            scheduler = %self.id,
            task_id = task.id,
            slot,
            queued = state.backlog.len(),
            "task claimed"
        );
        Some(task)
    }

    /// After a task settles: note any unhandled failure, then claim the next
    /// entry or close the slot.
    fn advance(&self, slot: SlotId, failure: Option<TaskFailure<E>>) -> Option<QueuedTask<T, E>> {
        let (next, finished) = {
            let mut state = self.state.lock();
            if let Some(failure) = failure {
                self.note_unhandled(&mut state, failure);
            }
            match self.claim_front(&mut state, slot) {
                Some(next) => (Some(next), None),
                None => (None, self.close_slot(&mut state, slot)),
            }
        };
        if let Some((outcome, waiters)) = finished {
            notify(waiters, &outcome);
        }
        next
    }

    /// Close a slot whose chain was dropped mid-flight.
    fn abandon(&self, slot: SlotId) {
        let finished = {
            let mut state = self.state.lock();
            self.note_unhandled(&mut state, TaskFailure::Aborted { slot });
            self.close_slot(&mut state, slot)
        };
        if let Some((outcome, waiters)) = finished {
            notify(waiters, &outcome);
        }
    }

    fn note_unhandled(&self, state: &mut SlotState<T, E>, failure: TaskFailure<E>) {
        self.counters.unhandled_failures.fetch_add(1, Ordering::Relaxed);
        if state.failure.is_none() {
            state.failure = Some(failure);
        } else {
            debug!(
                scheduler = %self.id,
                slot = failure.slot(),
                "unhandled failure dropped; first failure of the busy period is kept"
            );
        }
    }

    /// Returns the busy-period outcome and its waiters when the last chain closes.
    #[allow(clippy::type_complexity)]
    fn close_slot(
        &self,
        state: &mut SlotState<T, E>,
        slot: SlotId,
    ) -> Option<(Result<(), TaskFailure<E>>, Vec<Waiter<E>>)> {
        if let Some(flag) = state.busy.get_mut(slot) {
            *flag = false;
        }
        state.live = state.live.saturating_sub(1);
        self.counters.live_slots.fetch_sub(1, Ordering::Relaxed);
        self.record(None, Some(slot), AuditAction::SlotDrained, None);
        info!(scheduler = %self.id, slot, live = state.live, "slot chain drained");

        if state.live > 0 {
            return None;
        }
        state.last_outcome = state.failure.take().map_or(Ok(()), Err);
        Some((state.last_outcome.clone(), std::mem::take(&mut state.waiters)))
    }

    fn record(
        &self,
        task: Option<TaskId>,
        slot: Option<SlotId>,
        action: AuditAction,
        detail: Option<String>,
    ) {
        if let Some(audit) = &self.audit {
            audit.lock().record(build_audit_event(
                self.id.to_string(),
                task,
                slot,
                action,
                detail,
            ));
        }
    }
}

fn notify<E>(waiters: Vec<Waiter<E>>, outcome: &Result<(), TaskFailure<E>>) {
    for waiter in waiters {
        // A dropped receiver just means nobody is waiting any more.
        let _ = waiter.send(outcome.clone());
    }
}

/// One slot chain. Dropping it before it drains (even unpolled) closes the slot.
struct ChainGuard<T, E> {
    inner: Arc<Inner<T, E>>,
    slot: SlotId,
    finished: bool,
}

impl<T, E> ChainGuard<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    /// Run, report, claim the next entry, until the backlog is empty.
    async fn run(mut self, first: QueuedTask<T, E>) {
        let mut next = Some(first);
        while let Some(task) = next.take() {
            let id = task.id;
            let outcome = self.inner.execute(self.slot, task).await;
            let failure = self.inner.dispatch(id, self.slot, outcome);
            next = self.inner.advance(self.slot, failure);
        }
        self.finished = true;
    }
}

impl<T, E> Drop for ChainGuard<T, E> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(scheduler = %self.inner.id, slot = self.slot, "slot chain dropped before draining");
            self.inner.abandon(self.slot);
        }
    }
}

/// Counts a task as executing for as long as it is alive.
struct ActiveTask<'a>(&'a AtomicU64);

impl<'a> ActiveTask<'a> {
    fn new(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ActiveTask<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
