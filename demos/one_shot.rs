//! # Example: one_shot
//!
//! A one-shot subscription: fires once after its delay, then removes itself.
//!
//! Also shows that registering an earlier deadline interrupts the worker's
//! sleep toward a later one.
//!
//! ## Run
//! ```bash
//! cargo run --example one_shot
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chime::{Config, Subscribe, Timer};

struct Reminder {
    created: Instant,
}

impl Subscribe<String> for Reminder {
    fn notify(&self, parameter: &Arc<String>) {
        println!("[reminder] {parameter} (after {:?})", self.created.elapsed());
    }

    fn name(&self) -> &'static str {
        "reminder"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chime=debug".into()),
        )
        .init();

    let timer = Timer::new(Config::default());
    timer.start()?;

    let created = Instant::now();

    // The worker first arms toward this faraway deadline...
    let slow: Arc<dyn Subscribe<String>> = Arc::new(Reminder { created });
    timer.register(
        slow,
        Duration::from_secs(3600),
        Arc::new("an hour from now".to_string()),
        true,
    )?;

    // ...and this registration wakes it up so the 1s deadline wins.
    let soon: Arc<dyn Subscribe<String>> = Arc::new(Reminder { created });
    let parameter = Arc::new("one second from now".to_string());
    timer.register(
        Arc::clone(&soon),
        Duration::from_secs(1),
        Arc::clone(&parameter),
        true,
    )?;

    std::thread::sleep(Duration::from_millis(1500));

    // The one-shot removed itself after firing.
    assert!(!timer.is_registered(&soon, &parameter));

    timer.shutdown();
    Ok(())
}
