//! # Subscriber registry - the shared collection of subscriptions.
//!
//! Unordered collection of [`Entry`] records with duplicate detection,
//! identity-based removal, and the two scans the worker needs: the minimum
//! deadline and the due batch.
//!
//! ## Rules
//! - At most one entry per `(observer, parameter)` identity pair.
//! - Scans are linear. The timer targets tens of subscribers, where a `Vec`
//!   beats a priority structure and leaves no heap invariants to maintain
//!   under concurrent mutation.
//! - The registry itself is lock-free; callers guard it with the mutation
//!   lock in [`Shared`](crate::core::worker::Shared).

use std::sync::Arc;
use std::time::Instant;

use crate::core::entry::{Entry, Firing};
use crate::error::TimerError;
use crate::subscribers::Subscribe;

/// Unordered set of subscriptions, keyed by `(observer, parameter)` identity.
pub(crate) struct Registry<P> {
    entries: Vec<Entry<P>>,
}

impl<P> Registry<P> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts an entry, rejecting identity duplicates.
    ///
    /// On [`TimerError::DuplicateSubscription`] the existing entry is left
    /// untouched.
    pub(crate) fn insert(&mut self, entry: Entry<P>) -> Result<(), TimerError> {
        let duplicate = self
            .entries
            .iter()
            .any(|existing| existing.matches(entry.observer_ref(), entry.parameter_ref()));
        if duplicate {
            return Err(TimerError::DuplicateSubscription);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Removes the entry with the given identity. Returns false if absent.
    pub(crate) fn remove(
        &mut self,
        observer: &Arc<dyn Subscribe<P>>,
        parameter: &Arc<P>,
    ) -> bool {
        match self
            .entries
            .iter()
            .position(|entry| entry.matches(observer, parameter))
        {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(
        &self,
        observer: &Arc<dyn Subscribe<P>>,
        parameter: &Arc<P>,
    ) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.matches(observer, parameter))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest deadline across all entries, or `None` when empty.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(Entry::next_notify).min()
    }

    /// Collects every entry due at `now` into a firing batch.
    ///
    /// One-shot entries are removed from the registry here; repeating entries
    /// are rescheduled to `now + interval`. The returned batch preserves
    /// registration order.
    pub(crate) fn collect_due(&mut self, now: Instant) -> Vec<Firing<P>> {
        let mut due = Vec::new();
        self.entries.retain_mut(|entry| {
            if entry.next_notify() > now {
                return true;
            }
            due.push(entry.firing());
            if entry.is_once() {
                false
            } else {
                entry.reschedule(now);
                true
            }
        });
        due
    }
}
