//! Tests for audit sink

use task_throttle::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        "sched-1",
        Some(4),
        Some(1),
        AuditAction::Failed,
        Some("timeout".to_string()),
    );

    sink.record(event);
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].scheduler, "sched-1");
    assert_eq!(events[0].task_id, Some(4));
    assert_eq!(events[0].slot, Some(1));
    assert_eq!(events[0].action, AuditAction::Failed);
    assert_eq!(events[0].detail.as_deref(), Some("timeout"));
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("s", Some(1), None, AuditAction::Enqueued, None));
    sink.record(build_audit_event("s", Some(2), None, AuditAction::Enqueued, None));
    sink.record(build_audit_event("s", Some(3), None, AuditAction::Enqueued, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].task_id, Some(2)); // First one popped
    assert_eq!(events[1].task_id, Some(3));
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event("s", None, Some(0), AuditAction::SlotDrained, None);

    assert_eq!(event.task_id, None);
    assert_eq!(event.slot, Some(0));
    assert_eq!(event.action.as_str(), "slot_drained");
    assert!(event.detail.is_none());
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_tasks_with_filters_by_action() {
    let mut sink = InMemoryAuditSink::new(16);
    sink.record(build_audit_event("s", Some(0), Some(0), AuditAction::Started, None));
    sink.record(build_audit_event("s", Some(1), None, AuditAction::Enqueued, None));
    sink.record(build_audit_event("s", Some(0), Some(0), AuditAction::Completed, None));
    sink.record(build_audit_event("s", Some(1), Some(0), AuditAction::Started, None));

    assert_eq!(sink.tasks_with(AuditAction::Started), vec![0, 1]);
    assert_eq!(sink.tasks_with(AuditAction::Enqueued), vec![1]);
    assert!(sink.tasks_with(AuditAction::Failed).is_empty());
}
