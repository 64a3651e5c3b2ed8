//! Tests for error types

use std::sync::Arc;

use task_throttle::core::{SchedulerError, TaskFailure};

#[test]
fn test_invalid_concurrency_error() {
    let err = SchedulerError::InvalidConcurrency(0);
    assert_eq!(format!("{}", err), "invalid concurrency: 0 (must be greater than 0)");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("parse error: eof".to_string());
    assert_eq!(format!("{}", err), "invalid configuration: parse error: eof");
}

#[test]
fn test_no_runtime_error() {
    let err = SchedulerError::NoRuntime("not inside a runtime".to_string());
    assert_eq!(format!("{}", err), "no runtime available: not inside a runtime");
}

#[test]
fn test_task_failure_display() {
    let failed: TaskFailure<String> = TaskFailure::Failed {
        task: 3,
        slot: 0,
        error: Arc::new("connection reset".to_string()),
    };
    assert_eq!(format!("{}", failed), "task 3 failed in slot 0: connection reset");

    let aborted: TaskFailure<String> = TaskFailure::Aborted { slot: 2 };
    assert_eq!(format!("{}", aborted), "slot 2 was dropped before draining");
}

#[test]
fn test_task_failure_is_std_error() {
    let failure: TaskFailure<String> = TaskFailure::Panicked {
        task: 0,
        slot: 0,
        message: "boom".into(),
    };
    let boxed: Box<dyn std::error::Error> = Box::new(failure);
    assert!(boxed.to_string().contains("boom"));
}
