//! Monotonic millisecond clock
//!
//! The scheduler and the mowing state machine never read hardware time
//! directly. The firmware provides an embassy backed clock, tests drive a
//! [`MockClock`] by hand.

use core::cell::Cell;

/// Monotonic time source with millisecond resolution
pub trait Clock {
    /// Milliseconds since system start
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Hand-driven clock for deterministic tests
///
/// Share it with the scheduler by reference and advance it from the test:
///
/// ```
/// use mower_core::clock::{Clock, MockClock};
///
/// let clock = MockClock::new();
/// let view = &clock;
/// clock.advance(250);
/// assert_eq!(view.now_ms(), 250);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: Cell<u64>,
}

impl MockClock {
    /// Creates a clock starting at 0 ms
    pub const fn new() -> Self {
        Self {
            current_ms: Cell::new(0),
        }
    }

    /// Creates a clock starting at `ms`
    pub const fn starting_at(ms: u64) -> Self {
        Self {
            current_ms: Cell::new(ms),
        }
    }

    /// Jumps to an absolute time
    pub fn set(&self, ms: u64) {
        self.current_ms.set(ms);
    }

    /// Moves time forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.current_ms.set(self.current_ms.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.get()
    }
}
