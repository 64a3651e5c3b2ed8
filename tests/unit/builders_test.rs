//! Tests for builder modules

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use task_throttle::builders::SchedulerBuilder;
use task_throttle::config::SchedulerConfig;
use task_throttle::core::{Scheduler, SchedulerError, Spawn};

/// Spawner that counts chains before handing them to tokio.
#[derive(Clone, Default)]
struct CountingSpawner {
    spawned: Arc<AtomicUsize>,
}

impl Spawn for CountingSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(fut);
    }
}

#[test]
fn test_builder_from_config() {
    let builder: SchedulerBuilder<u32> = SchedulerBuilder::from_config(SchedulerConfig::new(8));
    assert_eq!(builder.config().concurrency, 8);
}

#[test]
fn test_builder_rejects_zero_concurrency() {
    let result = Scheduler::<u32>::builder(0)
        .spawner(CountingSpawner::default())
        .build();
    assert!(matches!(result, Err(SchedulerError::InvalidConcurrency(0))));
}

#[test]
fn test_builder_without_runtime_or_spawner_fails() {
    let result = Scheduler::<u32>::builder(2).build();
    assert!(matches!(result, Err(SchedulerError::NoRuntime(_))));
}

#[tokio::test]
async fn test_builder_uses_custom_spawner_once_per_chain() {
    let spawner = CountingSpawner::default();
    let scheduler = Scheduler::<u32>::builder(2)
        .spawner(spawner.clone())
        .build()
        .expect("scheduler");

    for v in 0..6 {
        scheduler.add(move || async move { Ok(v) });
    }
    scheduler.completion().await.expect("completion");

    // Two chains drained all six tasks.
    assert_eq!(spawner.spawned.load(Ordering::SeqCst), 2);
    assert_eq!(scheduler.concurrency(), 2);
    assert_eq!(scheduler.stats().completed_tasks, 6);
}
