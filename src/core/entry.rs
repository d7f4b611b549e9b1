//! One subscription record: identity plus scheduling state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::subscribers::Subscribe;

/// A single registered subscription.
///
/// Identity is the `(observer, parameter)` pair, compared by pointer: the
/// interval and the one-shot flag never participate in matching. Scheduling
/// state is the absolute `next_notify` deadline, advanced by the worker
/// after each repeating firing.
pub(crate) struct Entry<P> {
    observer: Arc<dyn Subscribe<P>>,
    parameter: Arc<P>,
    interval: Duration,
    once: bool,
    next_notify: Instant,
}

impl<P> Entry<P> {
    /// Creates an entry due `interval` from now.
    ///
    /// The caller validates the interval; a zero interval never reaches here.
    pub(crate) fn new(
        observer: Arc<dyn Subscribe<P>>,
        interval: Duration,
        parameter: Arc<P>,
        once: bool,
    ) -> Self {
        Self {
            observer,
            parameter,
            interval,
            once,
            next_notify: Instant::now() + interval,
        }
    }

    /// Returns true if this entry has the given `(observer, parameter)` identity.
    pub(crate) fn matches(&self, observer: &Arc<dyn Subscribe<P>>, parameter: &Arc<P>) -> bool {
        same_observer(&self.observer, observer) && Arc::ptr_eq(&self.parameter, parameter)
    }

    /// Absolute deadline of the next firing.
    pub(crate) fn next_notify(&self) -> Instant {
        self.next_notify
    }

    pub(crate) fn is_once(&self) -> bool {
        self.once
    }

    /// Advances the deadline to `now + interval` after a repeating firing.
    ///
    /// `now` is at or past the old deadline, so the deadline only ever moves
    /// forward.
    pub(crate) fn reschedule(&mut self, now: Instant) {
        self.next_notify = now + self.interval;
    }

    pub(crate) fn observer_ref(&self) -> &Arc<dyn Subscribe<P>> {
        &self.observer
    }

    pub(crate) fn parameter_ref(&self) -> &Arc<P> {
        &self.parameter
    }

    /// Clones the observer/parameter pair for a firing batch.
    pub(crate) fn firing(&self) -> Firing<P> {
        Firing {
            observer: Arc::clone(&self.observer),
            parameter: Arc::clone(&self.parameter),
        }
    }
}

/// One collected callback: everything the worker needs to notify an
/// observer after the registry lock has been released.
pub(crate) struct Firing<P> {
    pub(crate) observer: Arc<dyn Subscribe<P>>,
    pub(crate) parameter: Arc<P>,
}

/// Pointer identity for `dyn` observers.
///
/// Compares data pointers only: `Arc::ptr_eq` on trait objects also compares
/// vtable pointers, which may differ for the same value across codegen units.
fn same_observer<P>(a: &Arc<dyn Subscribe<P>>, b: &Arc<dyn Subscribe<P>>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
