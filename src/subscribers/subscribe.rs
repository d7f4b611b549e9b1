//! # Timer subscriber trait.
//!
//! Provides [`Subscribe`], the capability an observer implements to receive
//! scheduled callbacks from the timer's worker thread.
//!
//! ## Rules
//! - `notify` runs **on the worker thread** with **no timer locks held**:
//!   a callback is free to call back into the [`Timer`](crate::Timer) and
//!   register or unregister subscriptions, including its own.
//! - A slow callback delays the rest of the current notify pass and every
//!   later deadline; keep callbacks short or hand work off elsewhere.
//! - Panics inside `notify` are caught and logged by default
//!   (see [`Config`](crate::Config)).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use chime::Subscribe;
//!
//! struct Heartbeat;
//!
//! impl Subscribe<String> for Heartbeat {
//!     fn notify(&self, parameter: &Arc<String>) {
//!         println!("beat: {parameter}");
//!     }
//!
//!     fn name(&self) -> &'static str { "heartbeat" }
//! }
//! ```

use std::sync::Arc;

/// Observer capability invoked by the timer's worker thread.
///
/// A subscription is identified by the *pair* of observer and parameter, so
/// one observer may hold several subscriptions as long as each carries a
/// distinct parameter.
pub trait Subscribe<P>: Send + Sync {
    /// Receives one scheduled notification.
    ///
    /// Called on the worker thread with no locks held; reentrant calls into
    /// the timer (register/unregister, including self-removal) are supported.
    fn notify(&self, parameter: &Arc<P>);

    /// Returns the subscriber name used in logs.
    ///
    /// Prefer short, descriptive names (e.g., "scan", "cache-sweep").
    /// The default uses `type_name::<Self>()`, which can be verbose -
    /// override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
