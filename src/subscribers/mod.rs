//! # Subscribers for timer notifications.
//!
//! This module provides the [`Subscribe`] trait implemented by observers
//! that want to be called back on a schedule.
//!
//! ## Architecture
//! ```text
//! Notification flow:
//!   worker thread ── notify pass (no locks held) ──► Subscribe::notify(&parameter)
//!                                                        │
//!                                                   ┌────┴─────┬────────┐
//!                                                   ▼          ▼        ▼
//!                                                LogWriter   Metrics  Custom ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```rust
//! use std::sync::Arc;
//! use chime::Subscribe;
//!
//! struct CacheSweep;
//!
//! impl Subscribe<u32> for CacheSweep {
//!     fn notify(&self, generation: &Arc<u32>) {
//!         // evict entries older than *generation
//!     }
//!
//!     fn name(&self) -> &'static str { "cache-sweep" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
