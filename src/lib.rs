//! # chime
//!
//! **Chime** is a subscription-based notification timer.
//!
//! Independent observers register to be called back either once after a
//! delay or repeatedly at a fixed interval. A single background worker
//! thread sleeps exactly until the nearest deadline - no polling - and is
//! woken early whenever a registration, unregistration, or shutdown request
//! changes the deadline landscape. The crate is designed as a building
//! block for coarse-grained background maintenance (cache sweeps, rescans,
//! periodic flushes), not as a high-resolution real-time scheduler.
//!
//! ## Architecture
//! ```text
//!  caller threads                         worker thread
//!  ──────────────                         ─────────────
//!  register / unregister ──► Registry     loop {
//!        │                   (mutation      compute min deadline  ◄── Registry
//!        │                     lock)        sleep until deadline  ◄── wait lock + condvar
//!        └── wake() ───────► WaitState        │ (woken early on any mutation)
//!                            (wait lock)      ▼
//!                                           notify pass: collect due entries,
//!                                           drop one-shots, reschedule repeats,
//!                                           release locks, fire callbacks
//!                                         }
//! ```
//!
//! Two locks, never held together: the **mutation lock** guards the
//! subscriber registry; the **wait lock** and its condition variable only
//! park and wake the worker. Callbacks run with no locks held, so an
//! observer may register or unregister subscriptions - including its own -
//! from inside `notify`.
//!
//! ## Features
//! | Area               | Description                                              | Key types / traits          |
//! |--------------------|----------------------------------------------------------|-----------------------------|
//! | **Subscriber API** | Implement the observer capability called on a schedule.  | [`Subscribe`]               |
//! | **Scheduling**     | One-shot and fixed-interval subscriptions per identity.  | [`Timer::register`]         |
//! | **Lifecycle**      | Spawn and cooperatively stop the worker thread.          | [`Timer::start`], [`Timer::shutdown`] |
//! | **Errors**         | Typed, synchronous failures from every mutating call.    | [`TimerError`]              |
//! | **Configuration**  | Worker thread name and panic isolation policy.           | [`Config`]                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use chime::{Config, Subscribe, Timer};
//!
//! struct Rescan;
//!
//! impl Subscribe<String> for Rescan {
//!     fn notify(&self, parameter: &Arc<String>) {
//!         println!("rescanning {parameter}");
//!     }
//!     fn name(&self) -> &'static str { "rescan" }
//! }
//!
//! fn main() -> Result<(), chime::TimerError> {
//!     let timer = Timer::new(Config::default());
//!     timer.start()?;
//!
//!     let observer: Arc<dyn Subscribe<String>> = Arc::new(Rescan);
//!     let path = Arc::new("/media/library".to_string());
//!
//!     // Repeat every 30 seconds until unregistered.
//!     timer.register(Arc::clone(&observer), Duration::from_secs(30), Arc::clone(&path), false)?;
//!
//!     // ... application runs ...
//!
//!     timer.unregister(&observer, &path, false)?;
//!     timer.shutdown();
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod subscribers;

// ---- Public re-exports ----

pub use core::{Config, Timer};
pub use error::TimerError;
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logging subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
