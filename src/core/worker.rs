//! # Worker loop and wake protocol.
//!
//! [`Shared`] holds the state split across the timer's two synchronization
//! domains:
//!
//! - the **mutation lock** (`registry`), held briefly by register/unregister
//!   and by the worker's scans;
//! - the **wait lock** (`wait` + `cond`), used solely to park the worker and
//!   wake it after a mutation or on shutdown.
//!
//! Keeping them separate means signaling a wake-up never contends with an
//! in-progress registry scan, and the worker never holds the mutation lock
//! while asleep. No code path holds both locks at once.
//!
//! ## Worker states
//! ```text
//! Idle   (registry empty)    ── wait() ───────────── parked until signalled
//! Armed  (entries present)   ── wait_timeout(d) ──── parked until deadline d
//! Stopped (shutdown flag)    ── loop exited, thread joins
//! ```
//!
//! ## Missed-wakeup guard
//! A mutation can land between the worker's deadline snapshot and its call
//! to `wait_timeout`; the condvar signal would then hit nobody. `WaitState::
//! dirty` closes the window: mutators set it under the wait lock, and the
//! worker re-checks it after snapshotting and refuses to trust a sleep that
//! raced a mutation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::core::registry::Registry;

/// Wake protocol state, guarded by the wait lock.
struct WaitState {
    /// Cooperative shutdown request; checked at the top of every iteration.
    shutdown: bool,
    /// A registry mutation happened since the worker's last snapshot.
    dirty: bool,
    /// Thread id of the live worker; `None` while no worker is on its loop.
    /// Lets lifecycle calls detect the worker's own thread (callbacks) and
    /// wait for a worker to exit without holding the thread-handle slot.
    worker: Option<ThreadId>,
}

/// State shared between the [`Timer`](crate::Timer) facade and its worker
/// thread.
pub(crate) struct Shared<P> {
    registry: Mutex<Registry<P>>,
    wait: Mutex<WaitState>,
    cond: Condvar,
}

impl<P> Shared<P> {
    pub(crate) fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            wait: Mutex::new(WaitState {
                shutdown: false,
                dirty: false,
                worker: None,
            }),
            cond: Condvar::new(),
        }
    }

    /// Runs a closure under the mutation lock.
    pub(crate) fn with_registry<R>(&self, f: impl FnOnce(&mut Registry<P>) -> R) -> R {
        f(&mut lock(&self.registry))
    }

    /// Signals the worker that the registry changed.
    ///
    /// Called after the mutation lock has been released, so a parked worker
    /// re-scans fresh state and a scanning worker sees the dirty flag.
    pub(crate) fn wake(&self) {
        lock(&self.wait).dirty = true;
        self.cond.notify_all();
    }

    /// Requests cooperative shutdown and wakes the worker.
    pub(crate) fn request_shutdown(&self) {
        lock(&self.wait).shutdown = true;
        self.cond.notify_all();
    }

    /// Clears a previous shutdown request so the worker can be restarted.
    ///
    /// Signals the condvar so threads parked in [`Shared::await_shutdown_settled`]
    /// learn the request was revoked.
    pub(crate) fn clear_shutdown(&self) {
        lock(&self.wait).shutdown = false;
        self.cond.notify_all();
    }

    /// Returns true when called on the worker thread itself, i.e. from
    /// inside an observer callback.
    pub(crate) fn is_worker_thread(&self) -> bool {
        lock(&self.wait).worker == Some(thread::current().id())
    }

    /// Returns true while a shutdown request is pending.
    pub(crate) fn shutdown_pending(&self) -> bool {
        lock(&self.wait).shutdown
    }

    /// Blocks until a pending shutdown request is resolved: either the
    /// worker has left its loop (returns true) or a concurrent `start`
    /// revoked the request while the worker lives on (returns false).
    /// Returns immediately when no worker is alive.
    ///
    /// Must not be called on the worker thread; callbacks detect that case
    /// with [`Shared::is_worker_thread`] first.
    pub(crate) fn await_shutdown_settled(&self) -> bool {
        let mut wait = lock(&self.wait);
        while wait.worker.is_some() && wait.shutdown {
            wait = self
                .cond
                .wait(wait)
                .unwrap_or_else(PoisonError::into_inner);
        }
        wait.worker.is_none()
    }

    /// The worker loop: sleep exactly until the nearest deadline, then fire
    /// everything due. Runs until shutdown is requested.
    pub(crate) fn run(&self, catch_panics: bool) {
        let _presence = WorkerPresence::announce(self);
        debug!("timer worker started");

        loop {
            {
                let mut wait = lock(&self.wait);
                if wait.shutdown {
                    break;
                }
                // A fresh snapshot follows; forget stale wake-ups.
                wait.dirty = false;
            }

            let deadline = lock(&self.registry).next_deadline();

            let wait = lock(&self.wait);
            if wait.shutdown {
                break;
            }
            if wait.dirty {
                // A mutation raced the snapshot; recompute.
                continue;
            }

            let Some(deadline) = deadline else {
                trace!("no subscribers, parking until signalled");
                let _parked = self
                    .cond
                    .wait(wait)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                trace!(?remaining, "sleeping until next deadline");
                let (wait, timeout) = self
                    .cond
                    .wait_timeout(wait, remaining)
                    .unwrap_or_else(PoisonError::into_inner);
                if !timeout.timed_out() {
                    // Woken early (mutation, shutdown, or spurious): the
                    // deadline landscape may have changed, fire nothing.
                    continue;
                }
                drop(wait);
            } else {
                drop(wait);
            }

            self.notify_pass(catch_panics);
        }

        debug!("timer worker exiting");
    }

    /// One batch firing of everything currently due.
    ///
    /// The registry lock is released before any callback runs, so observers
    /// may freely register or unregister (including themselves) from inside
    /// `notify` without deadlocking against the worker.
    fn notify_pass(&self, catch_panics: bool) {
        let batch = lock(&self.registry).collect_due(Instant::now());
        if batch.is_empty() {
            return;
        }
        trace!(count = batch.len(), "notify pass");

        for firing in batch {
            if catch_panics {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    firing.observer.notify(&firing.parameter);
                }));
                if result.is_err() {
                    warn!(
                        subscriber = firing.observer.name(),
                        "subscriber panicked during notify"
                    );
                }
            } else {
                firing.observer.notify(&firing.parameter);
            }
        }
    }
}

/// Marks the worker thread as present in the wait state for as long as
/// [`Shared::run`] is on the stack.
///
/// Cleared on drop so the marker survives a propagated observer panic;
/// without it a dead worker would look alive forever and
/// [`Shared::await_shutdown_settled`] would never return.
struct WorkerPresence<'a, P> {
    shared: &'a Shared<P>,
}

impl<'a, P> WorkerPresence<'a, P> {
    fn announce(shared: &'a Shared<P>) -> Self {
        lock(&shared.wait).worker = Some(thread::current().id());
        Self { shared }
    }
}

impl<P> Drop for WorkerPresence<'_, P> {
    fn drop(&mut self) {
        lock(&self.shared.wait).worker = None;
        self.shared.cond.notify_all();
    }
}

/// Locks a mutex, absorbing poisoning.
///
/// Locks are never held across observer callbacks, so poison can only come
/// from a panic inside the timer itself with `catch_panics` disabled; the
/// guarded state is still consistent at every unlock point.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
