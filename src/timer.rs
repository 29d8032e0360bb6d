// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Cooperative countdown timer

use std::cell::Cell;
use std::rc::Rc;

use tokio::time::Instant;

/// Source of monotonic millisecond readings.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the clock was created.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Hand-advanced clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// A countdown decremented by one for every distinct clock reading it sees.
///
/// Several elapsed milliseconds between two calls to [`Countdown::advance`]
/// still count as a single step. Zero means elapsed.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    remaining: u32,
    previous: Option<u64>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, ticks: u32) {
        self.remaining = ticks;
    }

    pub fn cancel(&mut self) {
        self.remaining = 0;
    }

    pub fn advance(&mut self, now_ms: u64) {
        if self.previous == Some(now_ms) {
            return;
        }
        self.previous = Some(now_ms);
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_steps_once_per_reading() {
        let mut countdown = Countdown::new();
        countdown.start(3);
        countdown.advance(10);
        countdown.advance(10);
        countdown.advance(10);
        assert_eq!(countdown.remaining(), 2);
    }

    #[test]
    fn test_coalesced_ticks_count_once() {
        let mut countdown = Countdown::new();
        countdown.start(3);
        countdown.advance(1);
        countdown.advance(500);
        assert_eq!(countdown.remaining(), 1);
        countdown.advance(501);
        assert!(countdown.is_elapsed());
        countdown.advance(502);
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn test_idle_countdown_is_elapsed() {
        let countdown = Countdown::new();
        assert!(countdown.is_elapsed());
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now_ms(), 5);
        other.set(42);
        assert_eq!(clock.now_ms(), 42);
    }
}
