//! # Timer configuration.
//!
//! Provides [`Config`], the settings applied when the worker thread is
//! started.
//!
//! ## Field semantics
//! - `thread_name`: OS-level name given to the worker thread.
//! - `catch_panics`: whether observer panics are isolated per callback.

/// Configuration for a [`Timer`](crate::Timer).
#[derive(Clone, Debug)]
pub struct Config {
    /// Name assigned to the worker thread (visible in debuggers and
    /// thread listings).
    pub thread_name: String,

    /// Isolate observer panics.
    ///
    /// - `true` = a panicking callback is caught and logged; the rest of
    ///   the firing batch still runs and the worker survives.
    /// - `false` = the panic propagates and unwinds the worker thread;
    ///   no further notifications fire until the timer is restarted.
    pub catch_panics: bool,
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `thread_name = "chime-timer"`
    /// - `catch_panics = true` (one misbehaving observer cannot stop the rest)
    fn default() -> Self {
        Self {
            thread_name: "chime-timer".to_string(),
            catch_panics: true,
        }
    }
}
