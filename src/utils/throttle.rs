//! Token-bucket throttle for security event logging.
//!
//! Refused URLs are the expected outcome under attack, so every refusal is
//! counted but only `max_events` per window reach the log. The next admitted
//! event carries the number of events dropped since the last one.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub struct LogThrottle {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    max_events: NonZeroU32,
    window: Duration,
    suppressed: AtomicU64,
}

impl LogThrottle {
    pub fn new(window: Duration, max_events: u32) -> Self {
        let max_events = NonZeroU32::new(max_events).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / max_events.get())
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
            .allow_burst(max_events);

        Self {
            limiter: RateLimiter::direct(quota),
            max_events,
            window,
            suppressed: AtomicU64::new(0),
        }
    }

    /// Returns `Some(n)` when the caller may log, where `n` is the number of
    /// events suppressed since the previous admitted one. Returns `None` when
    /// the event should be dropped.
    pub fn admit(&self) -> Option<u64> {
        match self.limiter.check() {
            Ok(()) => Some(self.suppressed.swap(0, Ordering::Relaxed)),
            Err(_) => {
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), 20)
    }
}

impl std::fmt::Debug for LogThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogThrottle")
            .field("window", &self.window)
            .field("max_events", &self.max_events)
            .field("suppressed", &self.suppressed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppresses_after_budget() {
        let throttle = LogThrottle::new(Duration::from_secs(60), 2);

        assert_eq!(throttle.admit(), Some(0));
        assert_eq!(throttle.admit(), Some(0));
        assert_eq!(throttle.admit(), None);
        assert_eq!(throttle.admit(), None);
        assert_eq!(throttle.suppressed(), 2);
    }

    #[test]
    fn test_replenished_budget_reports_suppressed_count() {
        let throttle = LogThrottle::new(Duration::from_millis(200), 2);

        assert_eq!(throttle.admit(), Some(0));
        assert_eq!(throttle.admit(), Some(0));
        assert_eq!(throttle.admit(), None);
        assert_eq!(throttle.admit(), None);

        std::thread::sleep(Duration::from_millis(250));
        assert_eq!(throttle.admit(), Some(2));
        assert_eq!(throttle.suppressed(), 0);
    }

    #[test]
    fn test_zero_budget_still_admits_one_event() {
        let throttle = LogThrottle::new(Duration::from_secs(60), 0);

        assert_eq!(throttle.admit(), Some(0));
        assert_eq!(throttle.admit(), None);
    }
}
