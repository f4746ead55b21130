//! Error types for the thread pool.
//!
//! This module defines errors that may occur while managing the pool and while
//! observing the outcome of a task through its [`Future`](crate::Future).

use std::fmt;
use std::sync::Arc;

/// Represents errors that can occur while configuring the thread pool.
#[derive(Debug)]
pub enum PoolError {
    /// The requested worker count is outside of the accepted range.
    InvalidWorkerCount(usize),
    /// The operating system refused to start a worker thread.
    ThreadSpawn(std::io::Error),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidWorkerCount(n) => write!(f, "invalid worker count: {}", n),
            PoolError::ThreadSpawn(e) => write!(f, "failed to spawn worker thread: {}", e),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::ThreadSpawn(e) => Some(e),
            PoolError::InvalidWorkerCount(_) => None,
        }
    }
}

/// Raised by interruption points when the current thread was asked to stop.
///
/// This is a control-flow signal rather than a failure: a task receiving it is
/// expected to unwind early, usually by propagating it with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// The failure captured from a task that panicked, or that was failed
/// explicitly through [`Future::supply_failure`](crate::Future::supply_failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    message: Arc<str>,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
        }
    }

    /// Builds a failure out of a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked".to_string()
        };
        Self::new(message)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Reasons a [`Future`](crate::Future) did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FutureError {
    /// The future was cancelled before its task produced a result.
    Cancelled,
    /// The waiting thread was interrupted while blocked on the future.
    Interrupted,
    /// The future was waited on from inside its own task.
    SelfWait,
    /// The task panicked or was failed explicitly.
    Failed(TaskFailure),
}

impl fmt::Display for FutureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FutureError::Cancelled => write!(f, "future was cancelled"),
            FutureError::Interrupted => write!(f, "wait was interrupted"),
            FutureError::SelfWait => write!(f, "future waited on from its own task"),
            FutureError::Failed(failure) => write!(f, "task failed: {}", failure),
        }
    }
}

impl std::error::Error for FutureError {}

impl From<Interrupted> for FutureError {
    fn from(_: Interrupted) -> Self {
        FutureError::Interrupted
    }
}
