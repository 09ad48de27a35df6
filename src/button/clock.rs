//! Millisecond time source for polled inputs
//!
//! Timestamps are `u32` milliseconds that wrap around after ~49.7 days, the same
//! way a microcontroller tick counter does. Every interval must therefore be
//! computed with [`elapsed_ms`] instead of plain subtraction.

use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Current time in milliseconds, wrapping on overflow
    fn now_ms(&self) -> u32;

    /// Blocks the calling thread for `ms` milliseconds
    fn delay_ms(&self, ms: u32);
}

/// Wrap-tolerant difference `now - since`
#[inline]
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Wall clock backed by [`Instant`]
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
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
    fn now_ms(&self) -> u32 {
        // truncation is the wrap
        self.origin.elapsed().as_millis() as u32
    }

    fn delay_ms(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
