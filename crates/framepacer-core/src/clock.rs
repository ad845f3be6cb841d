//! Monotonic clock seam.
//!
//! The scheduler reads time only to bound the reconciler's flush call.
//! Injecting the clock lets tests drive time by hand.

use std::time::Instant;

/// Monotonic time source in float milliseconds.
pub trait Clock {
    /// Current monotonic time in milliseconds.
    fn now_ms(&self) -> f64;
}

/// Production clock over [`std::time::Instant`].
///
/// Reports milliseconds elapsed since the clock was created.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_never_decreases() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a, "time went backwards: {a} -> {b}");
    }

    #[test]
    fn starts_near_zero() {
        let clock = MonotonicClock::new();
        assert!(clock.now_ms() < 1000.0);
    }
}
