//! Deterministic simulated time.
//!
//! Time only moves when something sleeps on the clock or a test advances
//! it. Every sleep is recorded, so tests can assert the exact sequence of
//! cooldowns and backoff waits a pipeline run took.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use qg_core::Clock;

/// Simulated clock with nanosecond precision.
///
/// Safe to share across tasks behind an `Arc`; the pipeline sleeps on it
/// while fake services read it to timestamp calls.
pub struct SimClock {
    /// Current time in nanoseconds since the clock origin
    now_ns: AtomicU64,
    /// Every duration passed to `sleep`, in order
    sleeps: Mutex<Vec<Duration>>,
}

/// Bounds for time operations.
const TIME_NS_MAX: u64 = u64::MAX - 1_000_000_000_000; // Leave room for advances

impl SimClock {
    /// Create a new clock starting at time 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now_ns: AtomicU64::new(0),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ns() / 1_000_000
    }

    #[must_use]
    pub fn now_secs_f64(&self) -> f64 {
        self.now_ns() as f64 / 1e9
    }

    /// Advance time without recording a sleep (e.g. simulated latency).
    pub fn advance(&self, delta: Duration) {
        let delta_ns = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        let current = self.now_ns.load(Ordering::Acquire);
        debug_assert!(
            current <= TIME_NS_MAX.saturating_sub(delta_ns),
            "Time advance would overflow"
        );
        self.now_ns.fetch_add(delta_ns, Ordering::Release);
    }

    /// All sleeps requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock_sleeps().clone()
    }

    /// Total simulated time spent sleeping.
    #[must_use]
    pub fn slept_total(&self) -> Duration {
        self.lock_sleeps().iter().sum()
    }

    fn lock_sleeps(&self) -> std::sync::MutexGuard<'_, Vec<Duration>> {
        self.sleeps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SimClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns())
    }

    /// Records the sleep and advances time; returns immediately.
    async fn sleep(&self, duration: Duration) {
        self.lock_sleeps().push(duration);
        if !duration.is_zero() {
            self.advance(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        let clock = SimClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_advance_is_not_a_sleep() {
        let clock = SimClock::new();
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now_ms(), 250);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_sleep_records_and_advances() {
        let clock = SimClock::new();
        clock.sleep(Duration::from_secs(1)).await;
        clock.sleep(Duration::from_secs(2)).await;
        clock.sleep(Duration::ZERO).await;

        assert_eq!(clock.now(), Duration::from_secs(3));
        assert_eq!(
            clock.sleeps(),
            [Duration::from_secs(1), Duration::from_secs(2), Duration::ZERO]
        );
        assert_eq!(clock.slept_total(), Duration::from_secs(3));
    }

    #[test]
    fn test_unit_conversions() {
        let clock = SimClock::new();
        clock.advance(Duration::from_nanos(1_500_000_000));
        assert_eq!(clock.now_ms(), 1_500);
        assert!((clock.now_secs_f64() - 1.5).abs() < f64::EPSILON);
    }
}
