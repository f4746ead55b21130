//! # Macros for `taskpool`
//!
//! Shorthands for spawning tasks, creating pools and logging metrics.

/// Simplifies spawning tasks into the thread pool.
///
/// # Examples
/// ```rust
/// use taskpool::{spawn_task, Priority, ThreadPoolBuilder};
///
/// let pool = ThreadPoolBuilder::new().build().unwrap();
///
/// // Low priority, like `ThreadPool::spawn`
/// let future = spawn_task!(pool, || 1 + 1);
///
/// // Explicit priority
/// let urgent = spawn_task!(pool, || 2 + 2, priority: Priority::High);
///
/// assert_eq!(*future.get().unwrap(), 2);
/// assert_eq!(*urgent.get().unwrap(), 4);
/// pool.shutdown();
/// ```
#[macro_export]
macro_rules! spawn_task {
    ($pool:expr, $task:expr) => {
        $pool.spawn($task)
    };
    ($pool:expr, $task:expr, priority: $priority:expr) => {
        $pool.spawn_with_priority($task, $priority)
    };
}

/// Logs the current metrics of the thread pool at info level.
///
/// # Example
/// ```rust
/// use taskpool::{metrics::{ThreadPoolMetrics, AtomicMetricsCollector}, ThreadPoolBuilder, log_metrics};
/// use std::sync::Arc;
///
/// let metrics = Arc::new(ThreadPoolMetrics::new());
/// let collector = Arc::new(AtomicMetricsCollector::new(metrics.clone()));
/// let pool = ThreadPoolBuilder::new().with_metrics_collector(collector).build().unwrap();
///
/// log_metrics!(metrics);
/// pool.shutdown();
/// ```
#[macro_export]
macro_rules! log_metrics {
    ($metrics:expr) => {
        $crate::__log::info!(
            "queued={} running={} completed={} failed={} retried={} active_threads={}",
            $metrics
                .queued_tasks
                .load(::std::sync::atomic::Ordering::SeqCst),
            $metrics
                .running_tasks
                .load(::std::sync::atomic::Ordering::SeqCst),
            $metrics
                .completed_tasks
                .load(::std::sync::atomic::Ordering::SeqCst),
            $metrics
                .failed_tasks
                .load(::std::sync::atomic::Ordering::SeqCst),
            $metrics
                .retried_tasks
                .load(::std::sync::atomic::Ordering::SeqCst),
            $metrics
                .active_threads
                .load(::std::sync::atomic::Ordering::SeqCst)
        );
    };
}

/// Creates a thread pool, returning `Result<ThreadPool, PoolError>`.
///
/// # Examples
/// ```rust
/// use taskpool::create_thread_pool;
///
/// let pool = create_thread_pool!(num_threads: 8).unwrap();
/// let named = create_thread_pool!(num_threads: 2, thread_name: "loader").unwrap();
/// pool.shutdown();
/// named.shutdown();
/// ```
#[macro_export]
macro_rules! create_thread_pool {
    (num_threads: $num:expr) => {
        $crate::ThreadPoolBuilder::new().num_threads($num).build()
    };
    (num_threads: $num:expr, thread_name: $name:expr) => {
        $crate::ThreadPoolBuilder::new()
            .num_threads($num)
            .thread_name($name)
            .build()
    };
}
