//! Worker logic for the thread pool

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use super::task::{Task, TaskSignal};
use super::Shared;
use crate::errors::{PoolError, TaskFailure};
use crate::interrupt;
use crate::lock;
use crate::queue::Lane;

pub(crate) struct WorkerHandle {
    id: usize,
    retired: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Starts worker number `id` on its own OS thread.
    pub fn spawn(shared: &Arc<Shared>, id: usize) -> Result<Self, PoolError> {
        let retired = Arc::new(AtomicBool::new(false));
        let thread = thread::Builder::new()
            .name(format!("{} #{}", shared.thread_name, id + 1))
            .spawn({
                let shared = Arc::clone(shared);
                let retired = Arc::clone(&retired);
                move || worker_loop(id, shared, retired)
            })
            .map_err(PoolError::ThreadSpawn)?;
        Ok(Self {
            id,
            retired,
            thread: Some(thread),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Asks the worker to exit once its current task, if any, returns.
    /// Must be called with the pool lock held.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub fn take_thread(&mut self) -> Option<thread::JoinHandle<()>> {
        self.thread.take()
    }
}

/// Joins a worker thread unless it is the calling thread, which cannot wait
/// for itself and simply exits after its current task.
pub(crate) fn join_worker(handle: Option<thread::JoinHandle<()>>) {
    if let Some(handle) = handle {
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            log::error!("thread pool worker terminated abnormally");
        }
    }
}

enum Executed {
    Done,
    TryLater,
}

/// Worker thread main loop.
///
/// The pool lock is held at all times except while a task runs and while the
/// worker sleeps on the condition variable.
fn worker_loop(id: usize, shared: Arc<Shared>, retired: Arc<AtomicBool>) {
    log::debug!("worker #{} started", id + 1);
    if let Some(m) = shared.metrics.as_ref() {
        m.on_worker_started();
    }

    let mut state = lock(&shared.state);
    loop {
        if retired.load(Ordering::Acquire) {
            break;
        }
        if let Some(mut task) = state.queues.pop_next() {
            drop(state);
            let executed = execute(&shared, &mut task);
            state = lock(&shared.state);
            if let Executed::TryLater = executed {
                state.queues.push(Lane::Retry, task);
            }
            continue;
        }
        if state.shutting_down {
            break;
        }
        state.idle += 1;
        state = shared
            .cv
            .wait(state)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.idle -= 1;
    }
    drop(state);

    if let Some(m) = shared.metrics.as_ref() {
        m.on_worker_stopped();
    }
    log::debug!("worker #{} stopped", id + 1);
}

/// Runs one task outside of the pool lock. Panics are logged and swallowed,
/// interruptions are treated as an early return.
fn execute(shared: &Shared, task: &mut Task) -> Executed {
    if let Some(m) = shared.metrics.as_ref() {
        m.on_task_started();
    }

    let result = catch_unwind(AssertUnwindSafe(|| task.execute()));
    // An interruption aimed at this task must not leak into the next one.
    interrupt::current().reset();

    match result {
        Ok(Ok(())) => {
            if let Some(m) = shared.metrics.as_ref() {
                m.on_task_completed();
            }
            Executed::Done
        }
        Ok(Err(TaskSignal::Interrupted)) => {
            log::trace!("task interrupted");
            if let Some(m) = shared.metrics.as_ref() {
                m.on_task_completed();
            }
            Executed::Done
        }
        Ok(Err(TaskSignal::TryLater)) => {
            log::trace!("task parked in the retry lane");
            if let Some(m) = shared.metrics.as_ref() {
                m.on_task_retried();
            }
            Executed::TryLater
        }
        Err(payload) => {
            log::error!(
                "uncaught panic in thread pool: {}",
                TaskFailure::from_panic(payload)
            );
            if let Some(m) = shared.metrics.as_ref() {
                m.on_task_failed();
            }
            Executed::Done
        }
    }
}
