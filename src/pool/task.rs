//! Task abstraction for the thread pool.

use crate::errors::Interrupted;

/// Scheduling class of a task.
///
/// Priorities are strict and non-preemptive: a worker only looks at `Medium`
/// once `High` is empty, and at `Low` once both are empty. A running task is
/// never displaced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// Control-flow signals a task can hand back to its worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSignal {
    /// The task stopped early because its thread was interrupted.
    Interrupted,
    /// The task cannot make progress yet and wants to be parked in the retry
    /// lane until [`ThreadPool::run_later_tasks`](crate::ThreadPool::run_later_tasks).
    TryLater,
}

impl From<Interrupted> for TaskSignal {
    fn from(_: Interrupted) -> Self {
        TaskSignal::Interrupted
    }
}

pub type BoxedTask = Box<dyn FnMut() -> Result<(), TaskSignal> + Send + 'static>;

/// A unit of work owned by whichever queue currently holds it.
///
/// Tasks are `FnMut` so that a task parked in the retry lane can run again.
pub struct Task {
    body: BoxedTask,
}

impl Task {
    /// Wraps a closure that runs to completion exactly once.
    pub fn once<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut f = Some(f);
        Self {
            body: Box::new(move || {
                if let Some(f) = f.take() {
                    f();
                }
                Ok(())
            }),
        }
    }

    /// Wraps a closure that may ask to be retried or report an interruption.
    pub fn retryable<F>(f: F) -> Self
    where
        F: FnMut() -> Result<(), TaskSignal> + Send + 'static,
    {
        Self { body: Box::new(f) }
    }

    pub(crate) fn execute(&mut self) -> Result<(), TaskSignal> {
        (self.body)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}
