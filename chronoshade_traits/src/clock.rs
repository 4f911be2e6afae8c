use std::time::Instant;

/// Monotonic time source used by the cover workers.
///
/// The controller itself never reads the clock; every state transition takes
/// an explicit `now`. Workers ask their clock for that instant so tests can
/// substitute a manually advanced one.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock monotonic time backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Deterministic clock: `now() = origin + offset`, advanced by hand.
    ///
    /// Clones share the same offset, so a test can keep one handle and pass
    /// another to the code under test.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Move time forward by `d`.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Advance by fractional seconds; handy with time-map breakpoints.
        pub fn advance_secs(&self, secs: f64) {
            self.advance(Duration::from_secs_f64(secs));
        }

        /// Instant at `offset` past the origin, without moving the clock.
        pub fn at(&self, offset: Duration) -> Instant {
            self.origin + offset
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + off
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clones_share_offset() {
            let a = TestClock::new();
            let b = a.clone();
            let t0 = a.now();
            b.advance_secs(2.5);
            assert_eq!(a.now() - t0, Duration::from_millis(2500));
        }

        #[test]
        fn at_does_not_move_the_clock() {
            let c = TestClock::new();
            let t0 = c.now();
            assert_eq!(c.at(Duration::from_secs(10)) - t0, Duration::from_secs(10));
            assert_eq!(c.now(), t0);
        }
    }
}
