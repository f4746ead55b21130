//! Cooperative interruption.
//!
//! Every thread lazily owns an [`InterruptHandle`]. Raising it does not stop
//! the thread; it only makes the next interruption point on that thread
//! return [`Interrupted`]. Interruption points are [`sleep`],
//! [`interruption_point`], [`InterruptibleCondvar::wait`] and waiting on a
//! [`Future`](crate::Future).
//!
//! Code that never reaches an interruption point cannot be interrupted.
//!
//! [`InterruptHandle::interrupt`] notifies the condition variable the target
//! thread is registered on, but it cannot take the mutex that guards that
//! wait. A notification landing between the waiter's flag check and its
//! actual sleep is therefore lost, so condvar waits are bounded by a long
//! backstop slice instead of sleeping indefinitely. Ordinary interruptions
//! wake the waiter right away; only that narrow race pays the slice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam::sync::{Parker, Unparker};

use crate::errors::Interrupted;
use crate::lock;

/// Upper bound on how long a condvar wait can miss an interruption that raced
/// its registration.
const CONDVAR_BACKSTOP: Duration = Duration::from_millis(100);

/// Interruption flag of one thread.
pub struct InterruptHandle {
    interrupted: AtomicBool,
    unparker: Unparker,
    waiting_on: Mutex<Option<Arc<Condvar>>>,
}

impl InterruptHandle {
    fn new(unparker: Unparker) -> Self {
        Self {
            interrupted: AtomicBool::new(false),
            unparker,
            waiting_on: Mutex::new(None),
        }
    }

    /// Requests interruption of the owning thread and wakes it if it is
    /// blocked in an interruption-aware primitive.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        self.unparker.unpark();
        if let Some(cv) = lock(&self.waiting_on).as_ref() {
            cv.notify_all();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }

    fn register(&self, cv: Option<Arc<Condvar>>) {
        *lock(&self.waiting_on) = cv;
    }
}

struct Local {
    parker: Parker,
    handle: Arc<InterruptHandle>,
}

impl Local {
    fn new() -> Self {
        let parker = Parker::new();
        let handle = Arc::new(InterruptHandle::new(parker.unparker().clone()));
        Self { parker, handle }
    }
}

thread_local! {
    static LOCAL: Local = Local::new();
}

/// Returns the interruption handle of the calling thread.
pub fn current() -> Arc<InterruptHandle> {
    LOCAL.with(|local| Arc::clone(&local.handle))
}

/// Returns `true` if interruption was requested for the calling thread.
///
/// Unlike [`interruption_point`] this does not clear the request.
pub fn is_interrupted() -> bool {
    LOCAL.with(|local| local.handle.is_interrupted())
}

/// Returns `Err(Interrupted)` and clears the request if the calling thread was
/// asked to stop.
pub fn interruption_point() -> Result<(), Interrupted> {
    if LOCAL.with(|local| local.handle.take()) {
        Err(Interrupted)
    } else {
        Ok(())
    }
}

/// Puts the calling thread to sleep for `duration`, returning early with
/// `Err(Interrupted)` if the thread is interrupted meanwhile.
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    LOCAL.with(|local| {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if local.handle.take() {
                return Err(Interrupted);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    local.parker.park_timeout(deadline - now);
                }
                None => local.parker.park(),
            }
        }
    })
}

/// A condition variable whose waits are interruption points.
#[derive(Default)]
pub struct InterruptibleCondvar {
    inner: Arc<Condvar>,
}

impl InterruptibleCondvar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify_one(&self) {
        self.inner.notify_one();
    }

    pub fn notify_all(&self) {
        self.inner.notify_all();
    }

    /// Blocks until notified or interrupted. Like [`Condvar::wait`] it may
    /// also wake spuriously, so callers re-check their condition.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> Result<MutexGuard<'a, T>, Interrupted> {
        let handle = current();
        // Register before checking, so an interrupt raised after the check
        // sees the condvar and notifies it.
        handle.register(Some(Arc::clone(&self.inner)));
        if handle.take() {
            handle.register(None);
            return Err(Interrupted);
        }
        let (guard, _) = self
            .inner
            .wait_timeout(guard, CONDVAR_BACKSTOP)
            .unwrap_or_else(PoisonError::into_inner);
        handle.register(None);
        if handle.take() {
            Err(Interrupted)
        } else {
            Ok(guard)
        }
    }

    /// Blocks while `condition` holds.
    pub fn wait_while<'a, T, F>(
        &self,
        mut guard: MutexGuard<'a, T>,
        mut condition: F,
    ) -> Result<MutexGuard<'a, T>, Interrupted>
    where
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut *guard) {
            guard = self.wait(guard)?;
        }
        Ok(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn sleep_runs_to_completion() {
        let started = Instant::now();
        assert_eq!(sleep(Duration::from_millis(20)), Ok(()));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn sleep_is_cut_short_by_interrupt() {
        let (tx, rx) = crossbeam::channel::bounded(1);
        let sleeper = thread::spawn(move || {
            tx.send(current()).unwrap();
            let started = Instant::now();
            let res = sleep(Duration::from_secs(10));
            (res, started.elapsed())
        });
        let handle = rx.recv().unwrap();
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();

        let (res, elapsed) = sleeper.join().unwrap();
        assert_eq!(res, Err(Interrupted));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn interruption_point_clears_the_flag() {
        current().interrupt();
        assert!(is_interrupted());
        assert_eq!(interruption_point(), Err(Interrupted));
        assert!(!is_interrupted());
        assert_eq!(interruption_point(), Ok(()));
    }

    #[test]
    fn condvar_wait_is_interrupted() {
        let pair = Arc::new((Mutex::new(false), InterruptibleCondvar::new()));
        let (tx, rx) = crossbeam::channel::bounded(1);
        let waiter = {
            let pair = Arc::clone(&pair);
            thread::spawn(move || {
                tx.send(current()).unwrap();
                let (flag, cv) = &*pair;
                cv.wait_while(lock(flag), |ready| !*ready).map(|_| ())
            })
        };
        let handle = rx.recv().unwrap();
        thread::sleep(Duration::from_millis(30));
        let interrupted_at = Instant::now();
        handle.interrupt();
        assert_eq!(waiter.join().unwrap(), Err(Interrupted));
        // Woken by the notification, not by the backstop.
        assert!(interrupted_at.elapsed() < CONDVAR_BACKSTOP);
    }

    #[test]
    fn condvar_wait_sees_notification() {
        let pair = Arc::new((Mutex::new(false), InterruptibleCondvar::new()));
        let waiter = {
            let pair = Arc::clone(&pair);
            thread::spawn(move || {
                let (flag, cv) = &*pair;
                cv.wait_while(lock(flag), |ready| !*ready).map(|_| ())
            })
        };
        thread::sleep(Duration::from_millis(20));
        *lock(&pair.0) = true;
        pair.1.notify_all();
        assert_eq!(waiter.join().unwrap(), Ok(()));
    }
}
