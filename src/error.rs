//! Error types used by the timer.
//!
//! All variants of [`TimerError`] are synchronous, caller-facing failures:
//! they are returned directly from the mutating call that caused them and
//! nothing is retried internally.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the timer.
///
/// - Registration failures: [`TimerError::InvalidInterval`],
///   [`TimerError::DuplicateSubscription`].
/// - Unregistration failure: [`TimerError::NotFound`] (suppressed by the
///   `dont_fail` flag).
/// - Startup failure: [`TimerError::Spawn`] when the worker thread cannot
///   be created.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TimerError {
    /// The notify interval was zero. Intervals must be strictly positive.
    #[error("invalid notify interval {interval:?}; interval must be positive")]
    InvalidInterval {
        /// The rejected interval.
        interval: Duration,
    },

    /// A subscription with the same observer/parameter identity already
    /// exists. The earlier subscription is left untouched.
    #[error("subscription already exists for this observer/parameter pair")]
    DuplicateSubscription,

    /// No subscription matched the observer/parameter pair on unregister.
    #[error("no subscription found for this observer/parameter pair")]
    NotFound,

    /// The worker thread could not be spawned.
    #[error("failed to spawn timer worker thread: {0}")]
    Spawn(#[from] io::Error),
}

impl TimerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use chime::TimerError;
    /// use std::time::Duration;
    ///
    /// let err = TimerError::InvalidInterval { interval: Duration::ZERO };
    /// assert_eq!(err.as_label(), "invalid_interval");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TimerError::InvalidInterval { .. } => "invalid_interval",
            TimerError::DuplicateSubscription => "duplicate_subscription",
            TimerError::NotFound => "not_found",
            TimerError::Spawn(_) => "spawn_failed",
        }
    }
}
