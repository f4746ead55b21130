//! Metrics collection for the thread pool.
//!
//! This module defines the `MetricsCollector` trait for collecting metrics about the
//! thread pool's activity, as well as default implementations for atomic metrics collection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A trait for collecting metrics from the thread pool.
///
/// Implementations of this trait provide hooks to track key events in the thread pool,
/// such as task submission, execution, retries and worker lifecycle changes.
/// Hooks are called from worker threads and must not block.
pub trait MetricsCollector: Send + Sync {
    /// Called when a task is queued.
    fn on_task_submitted(&self);
    /// Called when a worker dequeues a task and starts executing it.
    fn on_task_started(&self);
    /// Called when a task returns normally or after an interruption.
    fn on_task_completed(&self);
    /// Called when a task panics.
    fn on_task_failed(&self);
    /// Called when a task parks itself in the retry lane.
    fn on_task_retried(&self);
    /// Called when `count` parked tasks are moved back to a runnable lane.
    fn on_retries_readmitted(&self, count: usize);
    /// Called when `count` queued tasks are dropped by `clear`.
    fn on_tasks_discarded(&self, count: usize);
    /// Called when a worker thread starts.
    fn on_worker_started(&self);
    /// Called when a worker thread stops.
    fn on_worker_stopped(&self);
}

/// Stores metrics for the thread pool using atomic counters.
#[derive(Debug, Default)]
pub struct ThreadPoolMetrics {
    /// Number of tasks currently sitting in a runnable lane.
    pub queued_tasks: AtomicUsize,
    /// Number of tasks currently being executed.
    pub running_tasks: AtomicUsize,
    /// Total number of tasks that have been completed.
    pub completed_tasks: AtomicUsize,
    /// Total number of tasks that panicked.
    pub failed_tasks: AtomicUsize,
    /// Number of tasks currently parked in the retry lane.
    pub retried_tasks: AtomicUsize,
    /// Number of worker threads currently active.
    pub active_threads: AtomicUsize,
}

impl ThreadPoolMetrics {
    /// Creates a new `ThreadPoolMetrics` instance with all counters initialized to zero.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A default implementation of `MetricsCollector` using atomic counters.
///
/// The `AtomicMetricsCollector` is backed by an `Arc<ThreadPoolMetrics>` to share
/// metrics across multiple components.
pub struct AtomicMetricsCollector {
    /// Shared metrics storage.
    pub metrics: Arc<ThreadPoolMetrics>,
}

impl AtomicMetricsCollector {
    pub fn new(metrics: Arc<ThreadPoolMetrics>) -> Self {
        Self { metrics }
    }
}

/// Decrements without wrapping below zero. `clear` may drop retry-lane tasks
/// that were already accounted as retried rather than queued.
fn saturating_sub(counter: &AtomicUsize, n: usize) {
    let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
        Some(v.saturating_sub(n))
    });
}

impl MetricsCollector for AtomicMetricsCollector {
    fn on_task_submitted(&self) {
        self.metrics.queued_tasks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_started(&self) {
        saturating_sub(&self.metrics.queued_tasks, 1);
        self.metrics.running_tasks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_completed(&self) {
        saturating_sub(&self.metrics.running_tasks, 1);
        self.metrics.completed_tasks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_failed(&self) {
        saturating_sub(&self.metrics.running_tasks, 1);
        self.metrics.failed_tasks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_retried(&self) {
        saturating_sub(&self.metrics.running_tasks, 1);
        self.metrics.retried_tasks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retries_readmitted(&self, count: usize) {
        saturating_sub(&self.metrics.retried_tasks, count);
        self.metrics.queued_tasks.fetch_add(count, Ordering::SeqCst);
    }

    fn on_tasks_discarded(&self, count: usize) {
        saturating_sub(&self.metrics.queued_tasks, count);
    }

    fn on_worker_started(&self) {
        self.metrics.active_threads.fetch_add(1, Ordering::SeqCst);
    }

    fn on_worker_stopped(&self) {
        saturating_sub(&self.metrics.active_threads, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_task_lifecycle() {
        let metrics = Arc::new(ThreadPoolMetrics::new());
        let collector = AtomicMetricsCollector::new(Arc::clone(&metrics));

        collector.on_task_submitted();
        collector.on_task_submitted();
        collector.on_task_started();
        assert_eq!(metrics.queued_tasks.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.running_tasks.load(Ordering::SeqCst), 1);

        collector.on_task_failed();
        assert_eq!(metrics.running_tasks.load(Ordering::SeqCst), 0);
        assert_eq!(metrics.failed_tasks.load(Ordering::SeqCst), 1);

        collector.on_tasks_discarded(5);
        assert_eq!(metrics.queued_tasks.load(Ordering::SeqCst), 0);
    }
}
