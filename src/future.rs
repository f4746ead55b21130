//! Single-result futures returned by the pool.
//!
//! A [`Future`] is a shared handle to the eventual outcome of one task. The
//! queued task only keeps a [`Weak`] reference to the future's state, so
//! dropping every handle of a future that has not started yet turns the queued
//! task into a no-op, and dropping it while the task runs interrupts the task.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::{self, ThreadId};

use crate::errors::{FutureError, TaskFailure};
use crate::interrupt::{self, InterruptHandle, InterruptibleCondvar};
use crate::lock;

type TaskFn<T> = Box<dyn FnOnce() -> T + Send + 'static>;
type SuccessCallback<T> = Box<dyn FnOnce(&T) + Send + 'static>;
type ErrorCallback = Box<dyn FnOnce(&FutureError) + Send + 'static>;

/// Controls what [`Future::wait_with`] does when the task is still queued.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Only block until a worker resolves the future.
    JustWait,
    /// Run the task on the waiting thread if no worker has picked it up yet.
    /// The queued copy then does nothing when a worker reaches it.
    #[default]
    ExecuteIfNotPickedUp,
}

enum Outcome<T> {
    Pending,
    Resolved(Arc<T>),
    Cancelled,
    Failed(TaskFailure),
}

impl<T> Outcome<T> {
    fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }

    fn to_result(&self) -> Option<Result<Arc<T>, FutureError>> {
        match self {
            Outcome::Pending => None,
            Outcome::Resolved(value) => Some(Ok(Arc::clone(value))),
            Outcome::Cancelled => Some(Err(FutureError::Cancelled)),
            Outcome::Failed(failure) => Some(Err(FutureError::Failed(failure.clone()))),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Outcome::Pending => "Pending",
            Outcome::Resolved(_) => "Resolved",
            Outcome::Cancelled => "Cancelled",
            Outcome::Failed(_) => "Failed",
        }
    }
}

/// The thread currently running a future's task.
struct Executor {
    thread: ThreadId,
    interrupt: Arc<InterruptHandle>,
}

impl Executor {
    fn current() -> Self {
        Self {
            thread: thread::current().id(),
            interrupt: interrupt::current(),
        }
    }
}

struct State<T> {
    outcome: Outcome<T>,
    task: Option<TaskFn<T>>,
    executor: Option<Executor>,
    /// Set once `cancel` raised the executor's interruption flag.
    executor_interrupted: bool,
    on_success: Vec<SuccessCallback<T>>,
    on_error: Vec<ErrorCallback>,
}

pub(crate) struct Inner<T> {
    state: Mutex<State<T>>,
    cv: InterruptibleCondvar,
}

/// Runs a user callback, logging instead of propagating a panic so that one
/// bad callback cannot take down the resolving worker.
fn invoke_callback(f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        log::error!(
            "future callback panicked: {}",
            TaskFailure::from_panic(payload)
        );
    }
}

impl<T: Send + Sync + 'static> Inner<T> {
    fn new(task: Option<TaskFn<T>>) -> Self {
        Self {
            state: Mutex::new(State {
                outcome: Outcome::Pending,
                task,
                executor: None,
                executor_interrupted: false,
                on_success: Vec::new(),
                on_error: Vec::new(),
            }),
            cv: InterruptibleCondvar::new(),
        }
    }

    /// Executes the task behind `weak`, if the future is still alive, still
    /// pending and nobody else took the task yet.
    ///
    /// No strong reference is held while the task body runs, so the last
    /// handle can still be dropped (and the task interrupted) meanwhile.
    pub(crate) fn run_task(weak: &Weak<Inner<T>>) {
        let task = {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = lock(&inner.state);
            if !state.outcome.is_pending() {
                return;
            }
            let Some(task) = state.task.take() else {
                return;
            };
            state.executor = Some(Executor::current());
            task
        };

        let result = catch_unwind(AssertUnwindSafe(task)).map_err(|payload| {
            let failure = TaskFailure::from_panic(payload);
            log::error!("uncaught panic in thread pool task: {}", failure);
            failure
        });

        let Some(inner) = weak.upgrade() else {
            return;
        };
        inner.finish_execution();
        match result {
            Ok(value) => inner.resolve(value),
            Err(failure) => inner.fail(failure),
        }
    }

    /// Detaches the calling thread as executor. An interruption raised by
    /// `cancel` targeted this task only, so it is withdrawn here; otherwise a
    /// caller that ran the task inline would stay interrupted.
    fn finish_execution(&self) {
        let mut state = lock(&self.state);
        state.executor = None;
        if std::mem::take(&mut state.executor_interrupted) {
            interrupt::current().reset();
        }
    }

    fn resolve(&self, value: T) {
        let value = Arc::new(value);
        let (on_success, on_error) = {
            let mut state = lock(&self.state);
            state.executor = None;
            if !state.outcome.is_pending() {
                return;
            }
            state.outcome = Outcome::Resolved(Arc::clone(&value));
            (
                std::mem::take(&mut state.on_success),
                std::mem::take(&mut state.on_error),
            )
        };
        self.cv.notify_all();
        drop(on_error);
        for callback in on_success {
            invoke_callback(|| callback(&value));
        }
    }

    fn fail(&self, failure: TaskFailure) {
        let (on_success, on_error) = {
            let mut state = lock(&self.state);
            state.executor = None;
            if !state.outcome.is_pending() {
                return;
            }
            state.outcome = Outcome::Failed(failure.clone());
            (
                std::mem::take(&mut state.on_success),
                std::mem::take(&mut state.on_error),
            )
        };
        self.cv.notify_all();
        drop(on_success);
        let error = FutureError::Failed(failure);
        for callback in on_error {
            invoke_callback(|| callback(&error));
        }
    }

    fn cancel(&self) {
        let dropped = {
            let mut state = lock(&self.state);
            if !state.outcome.is_pending() {
                return;
            }
            state.outcome = Outcome::Cancelled;
            if let Some(executor) = &state.executor {
                executor.interrupt.interrupt();
                state.executor_interrupted = true;
            }
            (
                state.task.take(),
                std::mem::take(&mut state.on_success),
                std::mem::take(&mut state.on_error),
            )
        };
        self.cv.notify_all();
        // Callbacks may own other futures; release them outside of the lock.
        drop(dropped);
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.outcome.is_pending() {
            if let Some(executor) = state.executor.take() {
                executor.interrupt.interrupt();
            }
        }
    }
}

/// A shared handle to the eventual result of a task.
///
/// Cloning a future clones the handle, not the result. Callbacks registered
/// with [`on_success`](Future::on_success) and friends run on whichever thread
/// resolves the future.
pub struct Future<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Future")
            .field("state", &state.outcome.name())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Future<T> {
    /// Creates a pending future without a task. It is resolved from the
    /// outside with [`supply_value`](Future::supply_value) or
    /// [`supply_failure`](Future::supply_failure).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(None)),
        }
    }

    pub(crate) fn with_task<F>(task: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner::new(Some(Box::new(task)))),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner<T>> {
        Arc::downgrade(&self.inner)
    }

    /// Resolves the future with `value`. Ignored if it is already resolved,
    /// failed or cancelled.
    pub fn supply_value(&self, value: T) {
        self.inner.resolve(value);
    }

    /// Fails the future. Ignored if it is already resolved, failed or cancelled.
    pub fn supply_failure(&self, message: impl Into<String>) {
        self.inner.fail(TaskFailure::new(message));
    }

    /// Cancels the future.
    ///
    /// A task that has not started will never run. A running task is
    /// interrupted, which only takes effect once it reaches an interruption
    /// point. A completed future is left untouched.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// `true` once the future reached a terminal state.
    pub fn has_result(&self) -> bool {
        !lock(&self.inner.state).outcome.is_pending()
    }

    /// `true` if the future resolved with a value.
    pub fn has_value(&self) -> bool {
        matches!(lock(&self.inner.state).outcome, Outcome::Resolved(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(lock(&self.inner.state).outcome, Outcome::Cancelled)
    }

    /// Blocks until the future reaches a terminal state, running the task on
    /// this thread if no worker picked it up yet.
    pub fn wait(&self) -> Result<(), FutureError> {
        self.wait_with(WaitMode::default())
    }

    pub fn wait_with(&self, mode: WaitMode) -> Result<(), FutureError> {
        self.outcome(mode).map(|_| ())
    }

    /// Blocks like [`wait`](Future::wait) and returns the value.
    pub fn get(&self) -> Result<Arc<T>, FutureError> {
        self.outcome(WaitMode::default())
    }

    fn outcome(&self, mode: WaitMode) -> Result<Arc<T>, FutureError> {
        interrupt::interruption_point()?;
        if mode == WaitMode::ExecuteIfNotPickedUp {
            Inner::run_task(&self.downgrade());
        }

        let state = lock(&self.inner.state);
        if let Some(result) = state.outcome.to_result() {
            return result;
        }
        if let Some(executor) = &state.executor {
            if executor.thread == thread::current().id() {
                return Err(FutureError::SelfWait);
            }
        }
        let state = self
            .inner
            .cv
            .wait_while(state, |state| state.outcome.is_pending())?;
        state
            .outcome
            .to_result()
            .unwrap_or(Err(FutureError::Cancelled))
    }

    /// Registers `callback` to run with the value once the future resolves.
    /// Runs it immediately if the value is already there; never runs it if
    /// the future fails or is cancelled.
    pub fn on_success<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let mut state = lock(&self.inner.state);
        match &state.outcome {
            Outcome::Pending => state.on_success.push(Box::new(callback)),
            Outcome::Resolved(value) => {
                let value = Arc::clone(value);
                drop(state);
                invoke_callback(|| callback(&value));
            }
            Outcome::Cancelled | Outcome::Failed(_) => {}
        }
        self
    }

    /// Registers `callback` to run if the task fails.
    pub fn on_error<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&FutureError) + Send + 'static,
    {
        let mut state = lock(&self.inner.state);
        match &state.outcome {
            Outcome::Pending => state.on_error.push(Box::new(callback)),
            Outcome::Failed(failure) => {
                let error = FutureError::Failed(failure.clone());
                drop(state);
                invoke_callback(|| callback(&error));
            }
            Outcome::Resolved(_) | Outcome::Cancelled => {}
        }
        self
    }

    /// Registers `callback` to run once the future either resolves or fails.
    pub fn on_finally<F>(&self, callback: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Some(callback)));
        let error_slot = Arc::clone(&slot);
        self.on_success(move |_| {
            let callback = lock(&slot).take();
            if let Some(callback) = callback {
                callback();
            }
        });
        self.on_error(move |_| {
            let callback = lock(&error_slot).take();
            if let Some(callback) = callback {
                callback();
            }
        })
    }

    /// Returns a future resolved with `f` applied to this future's value.
    /// Failures are forwarded; a panic in `f` fails the mapped future.
    ///
    /// The mapped future does not keep this one alive: dropping every handle
    /// of the source still cancels it, leaving the mapped future pending.
    pub fn map<U, F>(&self, f: F) -> Future<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let mapped = Future::new();
        let target = mapped.clone();
        self.on_success(move |value| match catch_unwind(AssertUnwindSafe(|| f(value))) {
            Ok(value) => target.supply_value(value),
            Err(payload) => target.inner.fail(TaskFailure::from_panic(payload)),
        });
        let target = mapped.clone();
        self.on_error(move |error| {
            if let FutureError::Failed(failure) = error {
                target.inner.fail(failure.clone());
            }
        });
        mapped
    }
}

/// An ordered collection of futures.
pub struct FutureSet<T> {
    futures: Vec<Future<T>>,
}

impl<T> Default for FutureSet<T> {
    fn default() -> Self {
        Self {
            futures: Vec::new(),
        }
    }
}

impl<T> Clone for FutureSet<T> {
    fn clone(&self) -> Self {
        Self {
            futures: self.futures.clone(),
        }
    }
}

impl<T> fmt::Debug for FutureSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.futures).finish()
    }
}

impl<T> FromIterator<Future<T>> for FutureSet<T> {
    fn from_iter<I: IntoIterator<Item = Future<T>>>(iter: I) -> Self {
        Self {
            futures: iter.into_iter().collect(),
        }
    }
}

impl<T> Extend<Future<T>> for FutureSet<T> {
    fn extend<I: IntoIterator<Item = Future<T>>>(&mut self, iter: I) {
        self.futures.extend(iter);
    }
}

impl<T> IntoIterator for FutureSet<T> {
    type Item = Future<T>;
    type IntoIter = std::vec::IntoIter<Future<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.futures.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a FutureSet<T> {
    type Item = &'a Future<T>;
    type IntoIter = std::slice::Iter<'a, Future<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.futures.iter()
    }
}

/// Keeps an `on_all_complete` callback alive until it fires. Owned only by
/// the success callbacks registered on the members.
struct AllComplete<T> {
    set: FutureSet<T>,
    callback: Mutex<Option<Box<dyn FnOnce() + Send + 'static>>>,
    can_fire: AtomicBool,
}

impl<T: Send + Sync + 'static> AllComplete<T> {
    fn try_fire(&self) {
        if !self.set.all_resolved() {
            return;
        }
        if self
            .can_fire
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let callback = lock(&self.callback).take();
            if let Some(callback) = callback {
                callback();
            }
        }
    }
}

impl<T> FutureSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, future: Future<T>) {
        self.futures.push(future);
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Future<T>> {
        self.futures.iter()
    }
}

impl<T: Send + Sync + 'static> FutureSet<T> {
    fn all_resolved(&self) -> bool {
        self.futures.iter().all(Future::has_value)
    }

    /// Waits for every member, starting from the most recently submitted one.
    ///
    /// Later submissions are the most likely to still be queued, so waiting on
    /// them first lets this thread pick them up instead of idling on an early
    /// member. Stops at the first member that did not produce a value.
    pub fn wait_for_all(&self) -> Result<(), FutureError> {
        for future in self.futures.iter().rev() {
            future.wait()?;
        }
        Ok(())
    }

    /// Waits for every member and returns the values in submission order.
    pub fn values(&self) -> Result<Vec<Arc<T>>, FutureError> {
        self.wait_for_all()?;
        self.futures.iter().map(Future::get).collect()
    }

    /// Returns the failure of the first already-completed member whose task
    /// failed. Does not block.
    pub fn check_for_exceptions(&self) -> Result<(), FutureError> {
        for future in &self.futures {
            let state = lock(&future.inner.state);
            if let Outcome::Failed(failure) = &state.outcome {
                return Err(FutureError::Failed(failure.clone()));
            }
        }
        Ok(())
    }

    /// Calls `callback` exactly once after every member resolved with a value.
    ///
    /// If that is already the case the callback runs right away on this
    /// thread. Otherwise it runs on the worker that resolves the last member.
    /// If any member fails or is cancelled, the callback never runs, whatever
    /// the order in which the members finish.
    /// The set itself may be dropped right after this call; the pending
    /// notification keeps the members alive until each of them has a result.
    pub fn on_all_complete<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.all_resolved() {
            callback();
            return;
        }
        if self.futures.iter().any(|f| f.has_result() && !f.has_value()) {
            return;
        }
        let pending = Arc::new(AllComplete {
            set: self.clone(),
            callback: Mutex::new(Some(Box::new(callback))),
            can_fire: AtomicBool::new(true),
        });
        for future in &self.futures {
            let pending = Arc::clone(&pending);
            future.on_success(move |_| pending.try_fire());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn supplied_value_is_observed() {
        let future = Future::new();
        assert!(!future.has_result());
        future.supply_value(7u32);
        assert!(future.has_value());
        assert_eq!(*future.get().unwrap(), 7);

        future.supply_value(8);
        assert_eq!(*future.get().unwrap(), 7);
    }

    #[test]
    fn task_runs_inline_when_not_picked_up() {
        let caller = thread::current().id();
        let future = Future::with_task(move || thread::current().id() == caller);
        assert!(*future.get().unwrap());
    }

    #[test]
    fn panicking_task_fails_the_future() {
        let future: Future<u32> = Future::with_task(|| panic!("bad input"));
        match future.get() {
            Err(FutureError::Failed(failure)) => assert_eq!(failure.message(), "bad input"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn cancelled_future_never_runs_its_task() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let future = Future::with_task(move || flag.store(true, Ordering::SeqCst));
        let weak = future.downgrade();
        future.cancel();

        Inner::run_task(&weak);
        assert_eq!(future.wait(), Err(FutureError::Cancelled));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn dropped_future_never_runs_its_task() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let future = Future::with_task(move || flag.store(true, Ordering::SeqCst));
        let weak = future.downgrade();
        drop(future);

        Inner::run_task(&weak);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn on_success_fires_late_and_early_registrations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let future = Future::new();

        let c = Arc::clone(&calls);
        future.on_success(move |v: &u32| {
            assert_eq!(*v, 3);
            c.fetch_add(1, Ordering::SeqCst);
        });
        future.supply_value(3);

        let c = Arc::clone(&calls);
        future.on_success(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn on_success_is_skipped_after_cancel() {
        let called = Arc::new(AtomicBool::new(false));
        let future: Future<u32> = Future::new();
        future.cancel();
        let c = Arc::clone(&called);
        future.on_success(move |_| c.store(true, Ordering::SeqCst));
        future.supply_value(1);
        assert!(!called.load(Ordering::SeqCst));
        assert!(future.is_cancelled());
    }

    #[test]
    fn on_error_and_on_finally() {
        let errors = Arc::new(AtomicUsize::new(0));
        let finals = Arc::new(AtomicUsize::new(0));
        let future: Future<u32> = Future::new();

        let e = Arc::clone(&errors);
        let f = Arc::clone(&finals);
        future
            .on_error(move |err| {
                assert!(matches!(err, FutureError::Failed(_)));
                e.fetch_add(1, Ordering::SeqCst);
            })
            .on_finally(move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
        future.supply_failure("disk full");

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(finals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn map_forwards_values_and_failures() {
        let source = Future::new();
        let doubled = source.map(|v: &u32| v * 2);
        source.supply_value(21);
        assert_eq!(*doubled.get().unwrap(), 42);

        let source: Future<u32> = Future::new();
        let mapped = source.map(|v| v + 1);
        source.supply_failure("nope");
        assert!(matches!(
            mapped.wait_with(WaitMode::JustWait),
            Err(FutureError::Failed(_))
        ));
    }

    #[test]
    fn waiting_from_another_thread_blocks_until_resolved() {
        let future = Future::new();
        let waiter = {
            let future = future.clone();
            thread::spawn(move || *future.get().unwrap())
        };
        thread::sleep(Duration::from_millis(20));
        future.supply_value(5u8);
        assert_eq!(waiter.join().unwrap(), 5);
    }

    #[test]
    fn on_all_complete_fires_once_after_last_member() {
        let calls = Arc::new(AtomicUsize::new(0));
        let members: Vec<Future<u32>> = (0..4).map(|_| Future::new()).collect();
        let set: FutureSet<u32> = members.iter().cloned().collect();

        let c = Arc::clone(&calls);
        set.on_all_complete(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        drop(set);

        for (i, member) in members.iter().enumerate() {
            assert_eq!(calls.load(Ordering::SeqCst), 0);
            member.supply_value(i as u32);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    fn all_complete_counter(set: &FutureSet<u32>) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        set.on_all_complete(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        calls
    }

    #[test]
    fn on_all_complete_skipped_when_failure_comes_first() {
        let (a, b) = (Future::new(), Future::new());
        let set: FutureSet<u32> = vec![a.clone(), b.clone()].into_iter().collect();
        let calls = all_complete_counter(&set);

        a.supply_failure("broken");
        b.supply_value(2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn on_all_complete_skipped_when_failure_comes_last() {
        let (a, b) = (Future::new(), Future::new());
        let set: FutureSet<u32> = vec![a.clone(), b.clone()].into_iter().collect();
        let calls = all_complete_counter(&set);

        b.supply_value(2);
        a.supply_failure("broken");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn on_all_complete_skipped_for_already_failed_set() {
        let (a, b) = (Future::new(), Future::new());
        a.supply_failure("broken");
        let set: FutureSet<u32> = vec![a, b.clone()].into_iter().collect();
        let calls = all_complete_counter(&set);

        b.supply_value(2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn on_all_complete_skipped_after_cancel() {
        let (a, b) = (Future::new(), Future::new());
        let set: FutureSet<u32> = vec![a.clone(), b.clone()].into_iter().collect();
        let calls = all_complete_counter(&set);

        a.supply_value(1);
        b.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn on_all_complete_runs_synchronously_when_done() {
        let set: FutureSet<u32> = (0..3)
            .map(|i| {
                let f = Future::new();
                f.supply_value(i);
                f
            })
            .collect();
        let called = Arc::new(AtomicBool::new(false));
        let c = Arc::clone(&called);
        set.on_all_complete(move || c.store(true, Ordering::SeqCst));
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn check_for_exceptions_reports_failed_member() {
        let ok = Future::new();
        ok.supply_value(1u32);
        let bad = Future::new();
        bad.supply_failure("broken");
        let pending = Future::new();
        let set: FutureSet<u32> = vec![ok, pending, bad].into_iter().collect();

        match set.check_for_exceptions() {
            Err(FutureError::Failed(failure)) => assert_eq!(failure.message(), "broken"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn values_keep_submission_order() {
        let set: FutureSet<usize> = (0..5).map(|i| Future::with_task(move || i * i)).collect();
        let values: Vec<usize> = set.values().unwrap().iter().map(|v| **v).collect();
        assert_eq!(values, vec![0, 1, 4, 9, 16]);
    }
}
