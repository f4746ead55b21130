mod parallel;
pub mod task;
mod worker;

use std::ops::Range;
use std::sync::{Arc, Condvar, Mutex};

use crate::errors::PoolError;
use crate::future::{Future, FutureSet, Inner};
use crate::lock;
use crate::metrics::MetricsCollector;
use crate::queue::{Lane, LaneQueues};
use parallel::split_range;
use task::{Priority, Task, TaskSignal};
use worker::{join_worker, WorkerHandle};

/// Environment variable read by [`ThreadPoolBuilder::build`] when no worker
/// count was configured explicitly.
pub const THREADS_ENV_VAR: &str = "TASKPOOL_THREADS";

/// Smallest worker count accepted by [`ThreadPool::set_workers_count`].
pub const MIN_RESIZE_WORKERS: usize = 2;

/// Largest worker count a pool can have.
pub const MAX_WORKERS: usize = 1000;

/// Everything the workers share. `state` is the only mutable part.
pub(crate) struct Shared {
    state: Mutex<PoolState>,
    cv: Condvar,
    metrics: Option<Arc<dyn MetricsCollector>>,
    thread_name: String,
}

pub(crate) struct PoolState {
    queues: LaneQueues,
    idle: usize,
    workers: Vec<WorkerHandle>,
    next_worker_id: usize,
    shutting_down: bool,
}

/// A fixed-size pool of worker threads with three strict priority lanes and a
/// retry lane.
///
/// Dropping the pool lets the workers drain every runnable task, then joins
/// them. Tasks parked in the retry lane are dropped.
pub struct ThreadPool {
    shared: Arc<Shared>,
}

impl ThreadPool {
    /// Creates a pool sized from [`THREADS_ENV_VAR`] or from the number of
    /// available cores.
    pub fn new() -> Result<Self, PoolError> {
        ThreadPoolBuilder::new().build()
    }

    /// Queues `f` as a fire-and-forget task.
    pub fn run<F>(&self, f: F, priority: Priority)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::once(f), priority);
    }

    /// Queues a task that may return [`TaskSignal::TryLater`] to be parked in
    /// the retry lane, or [`TaskSignal::Interrupted`] after an interruption.
    pub fn run_retryable<F>(&self, f: F, priority: Priority)
    where
        F: FnMut() -> Result<(), TaskSignal> + Send + 'static,
    {
        self.submit(Task::retryable(f), priority);
    }

    /// Queues an already built [`Task`].
    pub fn submit(&self, task: Task, priority: Priority) {
        let mut state = lock(&self.shared.state);
        state.queues.push(Lane::from(priority), task);
        if let Some(m) = self.shared.metrics.as_ref() {
            m.on_task_submitted();
        }
        if state.idle > 0 {
            self.shared.cv.notify_one();
        }
    }

    /// Queues `f` at low priority and returns a future for its result.
    pub fn spawn<F, T>(&self, f: F) -> Future<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.spawn_with_priority(f, Priority::Low)
    }

    pub fn spawn_with_priority<F, T>(&self, f: F, priority: Priority) -> Future<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        let future = Future::with_task(f);
        let weak = future.downgrade();
        self.run(move || Inner::run_task(&weak), priority);
        future
    }

    /// Splits `range` into one contiguous chunk per worker (fewer if there are
    /// fewer items) and runs `functor` on each chunk at low priority.
    ///
    /// The returned set holds one future per chunk, in chunk order.
    pub fn parallel<F, T>(&self, range: Range<usize>, functor: F) -> FutureSet<T>
    where
        F: Fn(Range<usize>) -> T + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let functor = Arc::new(functor);
        split_range(range, self.total_worker_count())
            .into_iter()
            .map(|chunk| {
                let functor = Arc::clone(&functor);
                self.spawn(move || functor(chunk))
            })
            .collect()
    }

    /// Grows or shrinks the pool to `count` workers.
    ///
    /// Shrinking retires the most recently started workers. A retiring worker
    /// finishes the task it is running, takes no new work and is joined with
    /// the pool lock released, so submissions keep flowing to the remaining
    /// workers meanwhile.
    pub fn set_workers_count(&self, count: usize) -> Result<(), PoolError> {
        if !(MIN_RESIZE_WORKERS..=MAX_WORKERS).contains(&count) {
            return Err(PoolError::InvalidWorkerCount(count));
        }

        let mut state = lock(&self.shared.state);
        loop {
            let active = state.workers.iter().filter(|w| !w.is_retired()).count();
            if active > count {
                let Some(worker) = state.workers.iter_mut().rev().find(|w| !w.is_retired())
                else {
                    break;
                };
                worker.retire();
                let id = worker.id();
                let handle = worker.take_thread();
                self.shared.cv.notify_all();
                drop(state);

                join_worker(handle);

                state = lock(&self.shared.state);
                state.workers.retain(|w| w.id() != id);
            } else if active < count {
                let id = state.next_worker_id;
                let worker = WorkerHandle::spawn(&self.shared, id)?;
                state.next_worker_id += 1;
                state.workers.push(worker);
            } else {
                break;
            }
        }
        log::debug!("thread pool resized to {} workers", count);
        Ok(())
    }

    pub fn total_worker_count(&self) -> usize {
        lock(&self.shared.state).workers.len()
    }

    pub fn idle_worker_count(&self) -> usize {
        lock(&self.shared.state).idle
    }

    /// Number of tasks waiting in the priority lanes. Parked retries are not
    /// counted.
    pub fn pending_task_count(&self) -> usize {
        lock(&self.shared.state).queues.pending()
    }

    /// Number of tasks parked in the retry lane.
    pub fn retry_task_count(&self) -> usize {
        lock(&self.shared.state).queues.retry_pending()
    }

    /// Drops every queued task, including parked retries. Tasks already
    /// running are not affected.
    pub fn clear(&self) {
        let discarded = lock(&self.shared.state).queues.clear();
        if let Some(m) = self.shared.metrics.as_ref() {
            m.on_tasks_discarded(discarded);
        }
    }

    /// Moves every parked retry to the back of the low-priority lane and
    /// wakes a worker.
    pub fn run_later_tasks(&self) {
        let mut state = lock(&self.shared.state);
        let moved = state.queues.readmit_retries();
        if let Some(m) = self.shared.metrics.as_ref() {
            m.on_retries_readmitted(moved);
        }
        self.shared.cv.notify_one();
    }

    /// Shuts the pool down, waiting for runnable tasks to finish.
    pub fn shutdown(self) {
        drop(self);
    }

    fn stop_workers(&self) {
        let handles: Vec<_> = {
            let mut state = lock(&self.shared.state);
            state.shutting_down = true;
            self.shared.cv.notify_all();
            state
                .workers
                .iter_mut()
                .map(WorkerHandle::take_thread)
                .collect()
        };
        for handle in handles {
            join_worker(handle);
        }
        lock(&self.shared.state).workers.clear();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop_workers();
    }
}

/// Builder for [`ThreadPool`].
pub struct ThreadPoolBuilder {
    num_threads: Option<usize>,
    thread_name: String,
    metrics_collector: Option<Arc<dyn MetricsCollector>>,
}

impl Default for ThreadPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadPoolBuilder {
    pub fn new() -> Self {
        Self {
            num_threads: None,
            thread_name: "taskpool".to_string(),
            metrics_collector: None,
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Prefix of the worker thread names; workers are named `"<prefix> #<n>"`.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_metrics_collector(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.metrics_collector = Some(collector);
        self
    }

    pub fn build(self) -> Result<ThreadPool, PoolError> {
        let num_threads = self
            .num_threads
            .or_else(threads_from_env)
            .unwrap_or_else(default_thread_count);
        if !(1..=MAX_WORKERS).contains(&num_threads) {
            return Err(PoolError::InvalidWorkerCount(num_threads));
        }

        let pool = ThreadPool {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queues: LaneQueues::new(),
                    idle: 0,
                    workers: Vec::with_capacity(num_threads),
                    next_worker_id: 0,
                    shutting_down: false,
                }),
                cv: Condvar::new(),
                metrics: self.metrics_collector,
                thread_name: self.thread_name,
            }),
        };

        {
            let mut state = lock(&pool.shared.state);
            for id in 0..num_threads {
                let worker = WorkerHandle::spawn(&pool.shared, id)?;
                state.workers.push(worker);
                state.next_worker_id = id + 1;
            }
        }
        log::debug!("thread pool started with {} workers", num_threads);
        Ok(pool)
    }
}

fn threads_from_env() -> Option<usize> {
    let value = std::env::var(THREADS_ENV_VAR).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("ignoring invalid {}={:?}", THREADS_ENV_VAR, value);
            None
        }
    }
}

/// One core is left to the caller, but a pool never starts with fewer than
/// two workers by default.
fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(2)
}
