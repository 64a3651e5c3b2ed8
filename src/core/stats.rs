//! Scheduler utilisation counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time statistics about a scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Configured number of slots.
    pub concurrency: usize,

    /// Slot chains currently live (running a task or about to claim one).
    pub live_slots: usize,

    /// Tasks currently executing.
    pub active_tasks: u64,

    /// Tasks waiting in the backlog.
    pub queued_tasks: u64,

    /// Total tasks passed to `add`.
    pub submitted_tasks: u64,

    /// Total tasks claimed by a slot.
    pub started_tasks: u64,

    /// Total tasks that produced a value.
    pub completed_tasks: u64,

    /// Total tasks that returned an error or panicked.
    pub failed_tasks: u64,

    /// Failures that were not absorbed by an `on_task_failed` callback.
    pub unhandled_failures: u64,
}

/// Internal counters for scheduler statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub live_slots: AtomicUsize,
    pub active_tasks: AtomicU64,
    pub queued_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
    pub started_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub unhandled_failures: AtomicU64,
}

impl SchedulerCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, concurrency: usize) -> SchedulerStats {
        SchedulerStats {
            concurrency,
            live_slots: self.live_slots.load(Ordering::Relaxed),
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks: self.queued_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            started_tasks: self.started_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            unhandled_failures: self.unhandled_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = SchedulerStats::default();
        assert_eq!(stats.concurrency, 0);
        assert_eq!(stats.active_tasks, 0);
        assert_eq!(stats.completed_tasks, 0);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = SchedulerCounters::default();
        counters.submitted_tasks.fetch_add(10, Ordering::Relaxed);
        counters.completed_tasks.fetch_add(5, Ordering::Relaxed);
        counters.live_slots.fetch_add(2, Ordering::Relaxed);

        let stats = counters.snapshot(4);
        assert_eq!(stats.concurrency, 4);
        assert_eq!(stats.submitted_tasks, 10);
        assert_eq!(stats.completed_tasks, 5);
        assert_eq!(stats.live_slots, 2);
        assert_eq!(stats.failed_tasks, 0);
    }
}
