//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints each notification to stdout in a human-readable
//! format. This is primarily useful for development, debugging, and demos.
//!
//! ## Output format
//! ```text
//! [notify] parameter="library-scan"
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints every notification it receives
/// to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

impl<P: Debug + Send + Sync> Subscribe<P> for LogWriter {
    fn notify(&self, parameter: &Arc<P>) {
        println!("[notify] parameter={parameter:?}");
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
