//! Timer core: registry, wake protocol, worker loop.
//!
//! The public API from this module is [`Timer`] and its [`Config`].
//!
//! Internal modules:
//! - [`entry`]: one subscription record (identity + scheduling state);
//! - [`registry`]: the shared collection with duplicate detection and scans;
//! - [`worker`]: shared state, wake protocol, and the worker loop;
//! - [`timer`]: the public facade wiring the above to a thread handle.

mod config;
mod entry;
mod registry;
mod timer;
mod worker;

pub use config::Config;
pub use timer::Timer;
