//! Time sources for the token bucket.
//!
//! The bucket only needs two things from the outside world: a monotonic
//! timestamp in microseconds and a way to suspend the calling thread.
//! [`MonotonicClock`] provides both from the standard library;
//! [`ManualClock`] simulates them so tests never depend on wall time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// A monotonic microsecond clock that can also suspend the caller.
pub trait Clock: Send + Sync {
    /// Current time in microseconds. Must never go backwards.
    fn now_micros(&self) -> u64;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_micros(&self) -> u64 {
        (**self).now_micros()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

static PROCESS_ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Steady clock measured from a process-wide anchor.
///
/// The anchor is taken the first time any `MonotonicClock` is read, so every
/// bucket in the process shares one time domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    /// Create a new monotonic clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> u64 {
        let anchor = PROCESS_ANCHOR.get_or_init(Instant::now);
        anchor.elapsed().as_micros() as u64
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Simulated clock for deterministic tests.
///
/// `sleep` does not block; it moves simulated time forward by the requested
/// duration, the same way a paused tokio runtime auto-advances.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
    slept: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start_micros`.
    pub fn new(start_micros: u64) -> Self {
        Self {
            now: AtomicU64::new(start_micros),
            slept: AtomicU64::new(0),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute time. Earlier values are ignored.
    pub fn set(&self, micros: u64) {
        self.now.fetch_max(micros, Ordering::SeqCst);
    }

    /// Total time spent in [`Clock::sleep`].
    pub fn total_slept(&self) -> Duration {
        Duration::from_micros(self.slept.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        let micros = duration.as_micros() as u64;
        self.slept.fetch_add(micros, Ordering::SeqCst);
        self.now.fetch_add(micros, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now_micros();
        clock.sleep(Duration::from_millis(2));
        let second = clock.now_micros();
        assert!(second >= first + 2_000);
    }

    #[test]
    fn test_monotonic_clocks_share_anchor() {
        let a = MonotonicClock::new();
        let b = MonotonicClock::new();
        let ta = a.now_micros();
        let tb = b.now_micros();
        assert!(tb >= ta);
    }

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_micros(), 1_000);

        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.now_micros(), 6_000);

        clock.set(10_000);
        assert_eq!(clock.now_micros(), 10_000);

        // Going back is ignored
        clock.set(2_000);
        assert_eq!(clock.now_micros(), 10_000);
    }

    #[test]
    fn test_manual_clock_sleep_advances_time() {
        let clock = ManualClock::new(0);
        clock.sleep(Duration::from_micros(250));
        clock.sleep(Duration::from_micros(750));

        assert_eq!(clock.now_micros(), 1_000);
        assert_eq!(clock.total_slept(), Duration::from_millis(1));
    }

    #[test]
    fn test_arc_clock_delegates() {
        let clock = Arc::new(ManualClock::new(42));
        let shared: Arc<ManualClock> = clock.clone();
        shared.sleep(Duration::from_micros(8));
        assert_eq!(Clock::now_micros(&shared), 50);
        assert_eq!(clock.total_slept(), Duration::from_micros(8));
    }
}
