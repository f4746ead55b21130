//! # taskpool
//!
//! `taskpool` is a background-task execution engine: a fixed-size pool of OS
//! worker threads with strict priority lanes, a retry lane, cancellable
//! single-result futures and a helper that fans a range of work out across
//! the workers.
//!
//! ## Features
//! - Three FIFO priority lanes (`High`, `Medium`, `Low`) drained strictly in
//!   that order, plus a retry lane for tasks that asked to run later.
//! - [`Future`]s with cooperative cancellation, completion callbacks and
//!   inline execution when waited on before a worker picks the task up.
//! - [`FutureSet`]s with "wait for all" and "notify once all are done".
//! - Resizable worker count.
//! - Metrics collection for monitoring thread pool activity.
//!
//! ## Usage
//!
//! ### Basic Usage
//! ```rust
//! use taskpool::{Priority, ThreadPoolBuilder};
//!
//! let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();
//!
//! // Fire and forget
//! pool.run(|| println!("Hello from the thread pool!"), Priority::Medium);
//!
//! // Submit and observe
//! let answer = pool.spawn(|| 6 * 7);
//! assert_eq!(*answer.get().unwrap(), 42);
//!
//! pool.shutdown();
//! ```
//!
//! ### Parallel Ranges
//! ```rust
//! use std::sync::Arc;
//! use taskpool::ThreadPoolBuilder;
//!
//! let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();
//! let data: Arc<Vec<u64>> = Arc::new((1..=100).collect());
//!
//! let sums = {
//!     let data = Arc::clone(&data);
//!     pool.parallel(0..data.len(), move |chunk| data[chunk].iter().sum::<u64>())
//! };
//! let total: u64 = sums.values().unwrap().iter().map(|s| **s).sum();
//! assert_eq!(total, 5050);
//! ```
//!
//! ### Cooperative Cancellation
//! ```rust
//! use std::time::Duration;
//! use taskpool::{interrupt, ThreadPoolBuilder};
//!
//! let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
//! let slow = pool.spawn(|| interrupt::sleep(Duration::from_secs(60)));
//! std::thread::sleep(Duration::from_millis(50));
//!
//! // The sleep inside the task returns early with `Err(Interrupted)`.
//! slow.cancel();
//! assert!(slow.is_cancelled());
//! ```
//!
//! ### Retrying Later
//! ```rust
//! use taskpool::{Priority, TaskSignal, ThreadPoolBuilder};
//!
//! let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
//! let mut ready = false;
//! pool.run_retryable(
//!     move || {
//!         if !ready {
//!             ready = true;
//!             return Err(TaskSignal::TryLater);
//!         }
//!         Ok(())
//!     },
//!     Priority::Medium,
//! );
//!
//! // ... later, once whatever the task waited for is available:
//! pool.run_later_tasks();
//! ```
//!
//! ### Collecting Metrics
//! ```rust
//! use taskpool::{metrics::{ThreadPoolMetrics, AtomicMetricsCollector}, Priority, ThreadPoolBuilder};
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(ThreadPoolMetrics::new());
//! let collector = Arc::new(AtomicMetricsCollector::new(metrics.clone()));
//!
//! let pool = ThreadPoolBuilder::new()
//!     .num_threads(4)
//!     .with_metrics_collector(collector)
//!     .build()
//!     .unwrap();
//!
//! for i in 0..5 {
//!     pool.run(move || println!("Task {} executed", i), Priority::Low);
//! }
//! pool.shutdown();
//!
//! assert_eq!(metrics.completed_tasks.load(std::sync::atomic::Ordering::SeqCst), 5);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

mod errors;
pub mod future;
pub mod interrupt;
mod macros;
pub mod metrics;
pub mod pool;
mod queue;

pub use errors::{FutureError, Interrupted, PoolError, TaskFailure};
pub use future::{Future, FutureSet, WaitMode};
pub use pool::task::{Priority, Task, TaskSignal};
pub use pool::{ThreadPool, ThreadPoolBuilder};

#[doc(hidden)]
pub use log as __log;

/// Locks `mutex`, recovering the guard if a panicking thread poisoned it.
/// Task panics are caught outside of every engine lock, so poisoning never
/// leaves engine state half-updated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
