//! Tests for configuration validation

use task_throttle::config::{SchedulerConfig, ENV_CONCURRENCY};
use task_throttle::core::SchedulerError;

#[test]
fn test_scheduler_config_validation() {
    let valid = SchedulerConfig::new(4);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_concurrency() {
    let invalid = SchedulerConfig { concurrency: 0 };
    assert!(matches!(
        invalid.validate(),
        Err(SchedulerError::InvalidConcurrency(0))
    ));
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{ "concurrency": 6 }"#;

    let config = SchedulerConfig::from_json_str(json).expect("valid config");
    assert_eq!(config.concurrency, 6);
}

#[test]
fn test_scheduler_config_from_json_rejects_zero() {
    let json = r#"{ "concurrency": 0 }"#;
    assert!(matches!(
        SchedulerConfig::from_json_str(json),
        Err(SchedulerError::InvalidConcurrency(0))
    ));
}

#[test]
fn test_scheduler_config_from_json_rejects_garbage() {
    let json = r#"{ "concurrency": "many" }"#;
    assert!(matches!(
        SchedulerConfig::from_json_str(json),
        Err(SchedulerError::InvalidConfig(_))
    ));
}

#[test]
fn test_scheduler_config_round_trips_through_json() {
    let config = SchedulerConfig::new(12);
    let json = serde_json::to_string(&config).expect("serialize");
    assert_eq!(json, r#"{"concurrency":12}"#);
}

#[test]
fn test_scheduler_config_from_env() {
    // Only test in this binary touching the variable.
    std::env::set_var(ENV_CONCURRENCY, "5");
    let config = SchedulerConfig::from_env().expect("env config");
    assert_eq!(config.concurrency, 5);

    std::env::set_var(ENV_CONCURRENCY, "zero");
    assert!(matches!(
        SchedulerConfig::from_env(),
        Err(SchedulerError::InvalidConfig(_))
    ));

    std::env::remove_var(ENV_CONCURRENCY);
    let config = SchedulerConfig::from_env().expect("default config");
    assert_eq!(config, SchedulerConfig::default());
}
