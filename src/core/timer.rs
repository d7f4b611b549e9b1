//! # Timer facade: registration, lifecycle, queries.
//!
//! [`Timer`] owns the shared state and the worker thread handle. All methods
//! take `&self`, so a timer can sit behind an `Arc` and be driven from any
//! thread - including from inside an observer callback.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::config::Config;
use crate::core::entry::Entry;
use crate::core::worker::Shared;
use crate::error::TimerError;
use crate::subscribers::Subscribe;

/// Subscription-based notification timer.
///
/// Observers register for one-shot or fixed-interval callbacks; a single
/// worker thread sleeps exactly until the nearest deadline (no polling) and
/// fires everything due with no locks held.
///
/// ## Lifecycle
/// - [`Timer::start`] spawns the worker thread; at most one worker exists
///   at any time.
/// - [`Timer::shutdown`] requests cooperative termination and blocks until
///   the worker has exited. Dropping the timer does the same.
/// - A stopped timer may be started again; registered subscriptions survive
///   the stop/start cycle.
/// - Both calls are safe from inside a callback: `shutdown` returns
///   immediately on the worker thread (the handle is reaped by the next
///   lifecycle call from another thread), and `shutdown` followed by
///   `start` in the same callback revokes the request and keeps the
///   current worker running.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use chime::{Config, Subscribe, Timer};
///
/// struct Sweep;
///
/// impl Subscribe<String> for Sweep {
///     fn notify(&self, parameter: &Arc<String>) {
///         println!("sweeping {parameter}");
///     }
///     fn name(&self) -> &'static str { "sweep" }
/// }
///
/// # fn main() -> Result<(), chime::TimerError> {
/// let timer = Timer::new(Config::default());
/// timer.start()?;
///
/// let observer: Arc<dyn Subscribe<String>> = Arc::new(Sweep);
/// let parameter = Arc::new("cache".to_string());
/// timer.register(Arc::clone(&observer), Duration::from_millis(250), Arc::clone(&parameter), false)?;
///
/// // ... later:
/// timer.unregister(&observer, &parameter, false)?;
/// timer.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct Timer<P> {
    shared: Arc<Shared<P>>,
    config: Config,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<P> Timer<P> {
    /// Creates a timer with the given configuration. The worker thread is
    /// not spawned until [`Timer::start`].
    pub fn new(config: Config) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            config,
            worker: Mutex::new(None),
        }
    }

    /// Registers an observer for scheduled notifications.
    ///
    /// The first firing is due `interval` from now; repeating subscriptions
    /// (`once = false`) are rescheduled to `now + interval` after each
    /// firing, one-shot subscriptions are removed right after their single
    /// firing.
    ///
    /// The worker reconsiders its sleep target immediately: a new entry with
    /// an earlier deadline than the current sleep target fires close to its
    /// own deadline.
    ///
    /// # Errors
    /// - [`TimerError::InvalidInterval`] if `interval` is zero.
    /// - [`TimerError::DuplicateSubscription`] if the `(observer, parameter)`
    ///   pair is already registered; the existing subscription is untouched.
    pub fn register(
        &self,
        observer: Arc<dyn Subscribe<P>>,
        interval: Duration,
        parameter: Arc<P>,
        once: bool,
    ) -> Result<(), TimerError> {
        if interval.is_zero() {
            return Err(TimerError::InvalidInterval { interval });
        }
        debug!(subscriber = observer.name(), ?interval, once, "adding timer subscriber");

        self.shared
            .with_registry(|registry| registry.insert(Entry::new(observer, interval, parameter, once)))?;
        self.shared.wake();
        Ok(())
    }

    /// Removes the subscription with the given `(observer, parameter)`
    /// identity. Interval and one-shot flag play no part in matching.
    ///
    /// # Errors
    /// [`TimerError::NotFound`] if no subscription matches, unless
    /// `dont_fail` is set, in which case absence is a silent no-op.
    pub fn unregister(
        &self,
        observer: &Arc<dyn Subscribe<P>>,
        parameter: &Arc<P>,
        dont_fail: bool,
    ) -> Result<(), TimerError> {
        debug!(subscriber = observer.name(), "removing timer subscriber");

        let removed = self
            .shared
            .with_registry(|registry| registry.remove(observer, parameter));
        if removed {
            // Removal may relax the nearest deadline, or empty the registry
            // entirely and let the worker park indefinitely.
            self.shared.wake();
            Ok(())
        } else if dont_fail {
            Ok(())
        } else {
            Err(TimerError::NotFound)
        }
    }

    /// Returns true if the `(observer, parameter)` pair is currently
    /// registered.
    pub fn is_registered(&self, observer: &Arc<dyn Subscribe<P>>, parameter: &Arc<P>) -> bool {
        self.shared
            .with_registry(|registry| registry.contains(observer, parameter))
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.with_registry(|registry| registry.len())
    }

    /// Returns true if no subscriptions are registered.
    pub fn is_empty(&self) -> bool {
        self.shared.with_registry(|registry| registry.is_empty())
    }

    /// Requests cooperative shutdown and blocks until the worker thread has
    /// exited.
    ///
    /// Idempotent, and a no-op if the timer was never started. No
    /// notification fires after the worker observes the shutdown flag; a
    /// notify pass already in progress runs to completion, and every caller
    /// blocks until it has - concurrent `shutdown` calls all return only
    /// once the worker has left its loop.
    ///
    /// Safe to call from inside a callback: the flag is set and the signal
    /// sent, but the call returns immediately on the worker's own thread
    /// (self-join would deadlock). The worker exits at the top of its next
    /// iteration, leaving its thread handle in place for the next `start`
    /// or `shutdown` from another thread to reap.
    pub fn shutdown(&self) {
        self.shared.request_shutdown();

        if self.shared.is_worker_thread() {
            // Called from a callback; the worker exits after this pass and
            // its handle is reaped by a later lifecycle call.
            return;
        }

        let exited = self.shared.await_shutdown_settled();
        if !exited || !self.shared.shutdown_pending() {
            // A concurrent start() revoked the request; the worker lives on.
            return;
        }

        if let Some(handle) = lock_worker(&self.worker).take() {
            debug!("waiting for timer worker to exit");
            if handle.join().is_err() {
                warn!("timer worker thread panicked");
            }
        }
    }
}

impl<P: Send + Sync + 'static> Timer<P> {
    /// Spawns the worker thread.
    ///
    /// Idempotent while the worker is running. Clears a previous shutdown
    /// request, so a stopped timer can be started again; a worker that died
    /// from a propagated panic is reaped first and replaced. At most one
    /// worker thread exists at any time.
    ///
    /// Called from inside a callback after a `shutdown` in the same
    /// callback, this revokes the pending request and the current worker
    /// simply keeps running - no second thread is spawned.
    ///
    /// # Errors
    /// [`TimerError::Spawn`] if the OS refuses to create the thread.
    pub fn start(&self) -> Result<(), TimerError> {
        if self.shared.is_worker_thread() {
            // shutdown() then start() inside one callback nets out to a
            // no-op: revoke the request before the worker re-checks it.
            self.shared.clear_shutdown();
            return Ok(());
        }

        let mut worker = lock_worker(&self.worker);
        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() && !self.shared.shutdown_pending() {
                return Ok(());
            }

            // The slot holds a worker that is dead (propagated panic) or
            // exiting after a shutdown request; reap it before respawning.
            if !self.shared.await_shutdown_settled() {
                // A callback revoked the request; that worker lives on.
                return Ok(());
            }
            if let Some(old) = worker.take() {
                if old.join().is_err() {
                    warn!("timer worker thread panicked");
                }
            }
        }

        self.shared.clear_shutdown();

        debug!(thread = %self.config.thread_name, "starting timer worker thread");
        let shared = Arc::clone(&self.shared);
        let catch_panics = self.config.catch_panics;
        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || shared.run(catch_panics))?;

        *worker = Some(handle);
        Ok(())
    }
}

impl<P> Default for Timer<P> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<P> Drop for Timer<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_worker<'a>(
    worker: &'a Mutex<Option<JoinHandle<()>>>,
) -> MutexGuard<'a, Option<JoinHandle<()>>> {
    worker.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    /// Counts notifications; the workhorse observer for the scenarios below.
    struct Counter {
        fired: AtomicUsize,
    }

    impl Counter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.fired.load(Ordering::SeqCst)
        }
    }

    impl Subscribe<&'static str> for Counter {
        fn notify(&self, _parameter: &Arc<&'static str>) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    fn as_observer(counter: &Arc<Counter>) -> Arc<dyn Subscribe<&'static str>> {
        Arc::clone(counter) as Arc<dyn Subscribe<&'static str>>
    }

    fn started_timer() -> Arc<Timer<&'static str>> {
        let timer = Arc::new(Timer::new(Config::default()));
        timer.start().unwrap();
        timer
    }

    fn sleep_ms(millis: u64) {
        thread::sleep(Duration::from_millis(millis));
    }

    #[test]
    fn test_register_rejects_zero_interval() {
        let timer: Timer<&'static str> = Timer::default();
        let counter = Counter::new();

        let err = timer
            .register(as_observer(&counter), Duration::ZERO, Arc::new("p"), false)
            .unwrap_err();
        assert!(matches!(err, TimerError::InvalidInterval { .. }));
        assert!(timer.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_pair() {
        let timer: Timer<&'static str> = Timer::default();
        let counter = Counter::new();
        let observer = as_observer(&counter);
        let parameter = Arc::new("p");

        timer
            .register(
                Arc::clone(&observer),
                Duration::from_millis(100),
                Arc::clone(&parameter),
                false,
            )
            .unwrap();
        let err = timer
            .register(
                Arc::clone(&observer),
                Duration::from_secs(9),
                Arc::clone(&parameter),
                true,
            )
            .unwrap_err();
        assert!(matches!(err, TimerError::DuplicateSubscription));
        // The first registration is intact.
        assert_eq!(timer.subscriber_count(), 1);
        assert!(timer.is_registered(&observer, &parameter));
    }

    #[test]
    fn test_unregister_unknown_pair() {
        let timer: Timer<&'static str> = Timer::default();
        let counter = Counter::new();
        let observer = as_observer(&counter);
        let parameter = Arc::new("p");

        let err = timer.unregister(&observer, &parameter, false).unwrap_err();
        assert!(matches!(err, TimerError::NotFound));

        // dont_fail turns absence into a no-op.
        timer.unregister(&observer, &parameter, true).unwrap();
    }

    #[test]
    fn test_repeating_subscription_fires_until_unregistered() {
        let timer = started_timer();
        let counter = Counter::new();
        let observer = as_observer(&counter);
        let parameter = Arc::new("repeat");

        timer
            .register(
                Arc::clone(&observer),
                Duration::from_millis(50),
                Arc::clone(&parameter),
                false,
            )
            .unwrap();

        sleep_ms(300);
        assert!(counter.count() >= 2, "expected >=2 firings, got {}", counter.count());
        assert!(timer.is_registered(&observer, &parameter));

        timer.unregister(&observer, &parameter, false).unwrap();
        let after_removal = counter.count();
        sleep_ms(200);
        assert_eq!(counter.count(), after_removal);
    }

    #[test]
    fn test_one_shot_fires_exactly_once_and_self_removes() {
        let timer = started_timer();
        let counter = Counter::new();
        let observer = as_observer(&counter);
        let parameter = Arc::new("once");

        timer
            .register(
                Arc::clone(&observer),
                Duration::from_millis(50),
                Arc::clone(&parameter),
                true,
            )
            .unwrap();

        sleep_ms(250);
        assert_eq!(counter.count(), 1);
        assert!(!timer.is_registered(&observer, &parameter));
        assert!(timer.is_empty());
    }

    #[test]
    fn test_registration_interrupts_armed_sleep() {
        let timer = started_timer();
        let slow = Counter::new();
        let fast = Counter::new();

        // Arm the worker toward a faraway deadline...
        timer
            .register(as_observer(&slow), Duration::from_secs(60), Arc::new("slow"), false)
            .unwrap();
        sleep_ms(50);

        // ...then slot in an earlier one. It must fire near its own
        // deadline, not after the 60s target.
        timer
            .register(as_observer(&fast), Duration::from_millis(100), Arc::new("fast"), true)
            .unwrap();

        sleep_ms(400);
        assert_eq!(fast.count(), 1);
        assert_eq!(slow.count(), 0);
    }

    #[test]
    fn test_shutdown_joins_worker_and_stops_notifications() {
        let timer = started_timer();
        let counter = Counter::new();

        timer
            .register(as_observer(&counter), Duration::from_millis(30), Arc::new("p"), false)
            .unwrap();
        sleep_ms(100);

        timer.shutdown();
        let at_shutdown = counter.count();
        sleep_ms(150);
        assert_eq!(counter.count(), at_shutdown);

        // Idempotent.
        timer.shutdown();
    }

    #[test]
    fn test_restart_after_shutdown() {
        let timer = started_timer();
        let counter = Counter::new();

        timer
            .register(as_observer(&counter), Duration::from_millis(40), Arc::new("p"), false)
            .unwrap();
        timer.shutdown();
        let stopped_at = counter.count();

        timer.start().unwrap();
        sleep_ms(250);
        assert!(counter.count() > stopped_at);
    }

    /// Unregisters itself from inside its own callback; the reentrancy case
    /// the lock-free notify pass exists for.
    struct SelfRemover {
        timer: Arc<Timer<&'static str>>,
        me: Mutex<Option<Arc<dyn Subscribe<&'static str>>>>,
        fired: AtomicUsize,
    }

    impl Subscribe<&'static str> for SelfRemover {
        fn notify(&self, parameter: &Arc<&'static str>) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            let me = lock_worker_test(&self.me).take();
            if let Some(me) = me {
                self.timer.unregister(&me, parameter, false).unwrap();
            }
        }

        fn name(&self) -> &'static str {
            "self-remover"
        }
    }

    fn lock_worker_test<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        m.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn test_callback_may_unregister_itself() {
        let timer = started_timer();
        let remover = Arc::new(SelfRemover {
            timer: Arc::clone(&timer),
            me: Mutex::new(None),
            fired: AtomicUsize::new(0),
        });
        let observer: Arc<dyn Subscribe<&'static str>> = Arc::clone(&remover) as _;
        *lock_worker_test(&remover.me) = Some(Arc::clone(&observer));

        let parameter = Arc::new("self");
        timer
            .register(
                Arc::clone(&observer),
                Duration::from_millis(40),
                Arc::clone(&parameter),
                false,
            )
            .unwrap();

        sleep_ms(300);
        // Fired once, removed itself, never fired again, no deadlock.
        assert_eq!(remover.fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_registered(&observer, &parameter));

        timer.shutdown();
    }

    /// Counts live threads with the given OS-level name.
    ///
    /// Tests that use it give their timer a unique `thread_name` so runs
    /// from parallel tests cannot be miscounted.
    #[cfg(target_os = "linux")]
    fn worker_thread_count(name: &str) -> usize {
        std::fs::read_dir("/proc/self/task")
            .unwrap()
            .filter(|task| {
                let comm = task.as_ref().unwrap().path().join("comm");
                std::fs::read_to_string(comm)
                    .map(|current| current.trim() == name)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Stops the timer from inside its own callback.
    struct Stopper {
        timer: Arc<Timer<&'static str>>,
        fired: AtomicUsize,
    }

    impl Subscribe<&'static str> for Stopper {
        fn notify(&self, _parameter: &Arc<&'static str>) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            self.timer.shutdown();
        }

        fn name(&self) -> &'static str {
            "stopper"
        }
    }

    #[test]
    fn test_callback_may_request_shutdown() {
        let timer = Arc::new(Timer::new(Config {
            thread_name: "chime-stop".to_string(),
            ..Config::default()
        }));
        timer.start().unwrap();

        let stopper = Arc::new(Stopper {
            timer: Arc::clone(&timer),
            fired: AtomicUsize::new(0),
        });
        let observer: Arc<dyn Subscribe<&'static str>> = Arc::clone(&stopper) as _;
        timer
            .register(observer, Duration::from_millis(30), Arc::new("stop"), true)
            .unwrap();

        let counter = Counter::new();
        timer
            .register(as_observer(&counter), Duration::from_millis(30), Arc::new("p"), false)
            .unwrap();

        // The callback's shutdown() returns without deadlocking and the
        // worker exits after the pass.
        sleep_ms(300);
        assert_eq!(stopper.fired.load(Ordering::SeqCst), 1);
        let stopped_at = counter.count();
        sleep_ms(150);
        assert_eq!(counter.count(), stopped_at);
        #[cfg(target_os = "linux")]
        assert_eq!(worker_thread_count("chime-stop"), 0);

        // A later start() from outside reaps the exited worker's handle and
        // spawns a replacement; surviving subscriptions resume.
        timer.start().unwrap();
        sleep_ms(200);
        assert!(counter.count() > stopped_at);
        #[cfg(target_os = "linux")]
        assert_eq!(worker_thread_count("chime-stop"), 1);
    }

    /// Restarts the timer from inside its own callback.
    struct Restarter {
        timer: Arc<Timer<&'static str>>,
        fired: AtomicUsize,
    }

    impl Subscribe<&'static str> for Restarter {
        fn notify(&self, _parameter: &Arc<&'static str>) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            self.timer.shutdown();
            self.timer.start().unwrap();
        }

        fn name(&self) -> &'static str {
            "restarter"
        }
    }

    #[test]
    fn test_callback_shutdown_then_start_keeps_one_worker() {
        let timer = Arc::new(Timer::new(Config {
            thread_name: "chime-restart".to_string(),
            ..Config::default()
        }));
        timer.start().unwrap();

        let restarter = Arc::new(Restarter {
            timer: Arc::clone(&timer),
            fired: AtomicUsize::new(0),
        });
        let observer: Arc<dyn Subscribe<&'static str>> = Arc::clone(&restarter) as _;
        timer
            .register(observer, Duration::from_millis(40), Arc::new("restart"), true)
            .unwrap();

        let counter = Counter::new();
        timer
            .register(as_observer(&counter), Duration::from_millis(40), Arc::new("p"), false)
            .unwrap();

        sleep_ms(300);
        // The shutdown request was revoked inside the callback: the timer
        // kept firing, on exactly one worker thread.
        assert_eq!(restarter.fired.load(Ordering::SeqCst), 1);
        assert!(counter.count() >= 2);
        #[cfg(target_os = "linux")]
        assert_eq!(worker_thread_count("chime-restart"), 1);

        timer.shutdown();
        let stopped_at = counter.count();
        sleep_ms(150);
        assert_eq!(counter.count(), stopped_at);
        #[cfg(target_os = "linux")]
        assert_eq!(worker_thread_count("chime-restart"), 0);
    }

    #[test]
    fn test_start_respawns_after_propagated_panic() {
        let timer = Arc::new(Timer::new(Config {
            thread_name: "chime-fatal".to_string(),
            catch_panics: false,
        }));
        timer.start().unwrap();

        let exploder: Arc<dyn Subscribe<&'static str>> = Arc::new(Exploder);
        timer
            .register(exploder, Duration::from_millis(30), Arc::new("boom"), true)
            .unwrap();
        sleep_ms(200);
        #[cfg(target_os = "linux")]
        assert_eq!(worker_thread_count("chime-fatal"), 0);

        // The dead worker is reaped and replaced; the timer is live again.
        timer.start().unwrap();
        let counter = Counter::new();
        timer
            .register(as_observer(&counter), Duration::from_millis(30), Arc::new("p"), false)
            .unwrap();
        sleep_ms(200);
        assert!(counter.count() >= 2);
    }

    /// Sleeps inside notify long enough that shutdown callers must wait for
    /// the pass to finish.
    struct SlowObserver;

    impl Subscribe<&'static str> for SlowObserver {
        fn notify(&self, _parameter: &Arc<&'static str>) {
            thread::sleep(Duration::from_millis(300));
        }

        fn name(&self) -> &'static str {
            "slow-observer"
        }
    }

    #[test]
    fn test_concurrent_shutdowns_both_block_until_worker_exits() {
        let timer = Arc::new(Timer::new(Config {
            thread_name: "chime-join".to_string(),
            ..Config::default()
        }));
        timer.start().unwrap();

        let slow: Arc<dyn Subscribe<&'static str>> = Arc::new(SlowObserver);
        timer
            .register(slow, Duration::from_millis(20), Arc::new("slow"), true)
            .unwrap();
        // Land both shutdown calls while the worker sits inside the 300ms
        // callback.
        sleep_ms(100);

        let spawn_shutdown = || {
            let timer = Arc::clone(&timer);
            thread::spawn(move || {
                let begun = Instant::now();
                timer.shutdown();
                begun.elapsed()
            })
        };
        let first = spawn_shutdown();
        let second = spawn_shutdown();

        // Both callers - not just the one that reaps the handle - wait for
        // the in-progress pass and the worker's exit.
        let waited_first = first.join().unwrap();
        let waited_second = second.join().unwrap();
        assert!(
            waited_first >= Duration::from_millis(100),
            "shutdown returned after {waited_first:?}"
        );
        assert!(
            waited_second >= Duration::from_millis(100),
            "shutdown returned after {waited_second:?}"
        );
        #[cfg(target_os = "linux")]
        assert_eq!(worker_thread_count("chime-join"), 0);
    }

    /// Panics on every firing; used to prove panic isolation.
    struct Exploder;

    impl Subscribe<&'static str> for Exploder {
        fn notify(&self, _parameter: &Arc<&'static str>) {
            panic!("observer blew up");
        }

        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[test]
    fn test_panicking_observer_does_not_kill_worker() {
        let timer = started_timer();
        let counter = Counter::new();

        let exploder: Arc<dyn Subscribe<&'static str>> = Arc::new(Exploder);
        timer
            .register(exploder, Duration::from_millis(40), Arc::new("boom"), true)
            .unwrap();
        timer
            .register(as_observer(&counter), Duration::from_millis(40), Arc::new("p"), false)
            .unwrap();

        sleep_ms(300);
        // The exploder panicked, yet the counter kept firing.
        assert!(counter.count() >= 2);
    }
}
