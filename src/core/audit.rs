//! Audit sink implementations.
//!
//! A sink receives one event per scheduling decision. `Started` events are
//! recorded while the backlog lock is held, so their order in a sink is the
//! order in which tasks were claimed. Sinks must therefore not call back into
//! the scheduler that feeds them.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{SlotId, TaskId};
use crate::util::clock::now_ms;

/// Scheduling decision recorded in an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    /// Task appended to the backlog.
    Enqueued,
    /// A slot chain was opened.
    SlotOpened,
    /// Task claimed by a slot.
    Started,
    /// Task produced a value.
    Completed,
    /// Task returned an error or panicked.
    Failed,
    /// A slot chain observed an empty backlog and ended.
    SlotDrained,
}

impl AuditAction {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::SlotOpened => "slot_opened",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::SlotDrained => "slot_drained",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Instance id of the scheduler that emitted the event.
    pub scheduler: String,
    /// Related task, if any.
    pub task_id: Option<TaskId>,
    /// Related slot, if any.
    pub slot: Option<SlotId>,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context (failure text).
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
///
/// Clones share the same buffer, so a caller can keep one handle and give the
/// other to a scheduler.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Task ids of all events with the given action, in recording order.
    pub fn tasks_with(&self, action: AuditAction) -> Vec<TaskId> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .filter_map(|e| e.task_id)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    scheduler: impl Into<String>,
    task_id: Option<TaskId>,
    slot: Option<SlotId>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        scheduler: scheduler.into(),
        task_id,
        slot,
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
