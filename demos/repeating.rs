//! # Example: repeating
//!
//! A repeating subscription firing every 500ms until unregistered.
//!
//! Demonstrates how to:
//! - Implement [`Subscribe`] for a custom observer.
//! - Register a fixed-interval subscription.
//! - Unregister it and shut the worker down cleanly.
//!
//! ## Run
//! ```bash
//! cargo run --example repeating
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chime::{Config, Subscribe, Timer};

struct Heartbeat {
    beats: AtomicUsize,
}

impl Subscribe<String> for Heartbeat {
    fn notify(&self, parameter: &Arc<String>) {
        let n = self.beats.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[heartbeat] #{n} parameter={parameter}");
    }

    fn name(&self) -> &'static str {
        "heartbeat"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chime=debug".into()),
        )
        .init();

    // 1. Create and start the timer
    let timer = Timer::new(Config::default());
    timer.start()?;

    // 2. Register a repeating subscription
    let observer: Arc<dyn Subscribe<String>> = Arc::new(Heartbeat {
        beats: AtomicUsize::new(0),
    });
    let parameter = Arc::new("demo".to_string());
    timer.register(
        Arc::clone(&observer),
        Duration::from_millis(500),
        Arc::clone(&parameter),
        false,
    )?;

    // 3. Let it beat for a while
    std::thread::sleep(Duration::from_secs(3));

    // 4. Remove the subscription and stop the worker
    timer.unregister(&observer, &parameter, false)?;
    timer.shutdown();
    println!("done");
    Ok(())
}
