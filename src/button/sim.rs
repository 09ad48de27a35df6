//! Simulated hardware for tests: a manually advanced clock and input lines that
//! replay a scripted level timeline against that clock.

use super::clock::Clock;
use super::line::{Level, RawInput};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct SimClock {
    now: Arc<AtomicU32>,
}

impl SimClock {
    pub fn starting_at(ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(ms)),
        }
    }

    pub fn advance(&self, ms: u32) {
        let now = self.now.load(Ordering::SeqCst);
        self.now.store(now.wrapping_add(ms), Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }

    fn delay_ms(&self, ms: u32) {
        self.advance(ms);
    }
}

/// Active-low line whose level is a step function of simulated time.
///
/// Offsets are relative to the clock value at construction, so scripts read the
/// same no matter where the clock started.
#[derive(Clone, Debug)]
pub struct ScriptedLine {
    clock: SimClock,
    origin: u32,
    idle: Level,
    steps: Vec<(u32, Level)>,
}

impl ScriptedLine {
    pub fn new(clock: &SimClock) -> Self {
        Self {
            clock: clock.clone(),
            origin: clock.now_ms(),
            idle: Level::High,
            steps: Vec::new(),
        }
    }

    pub fn set(mut self, at: u32, level: Level) -> Self {
        let idx = self.steps.partition_point(|(t, _)| *t <= at);
        self.steps.insert(idx, (at, level));
        self
    }

    /// Clean press held from `from` until `to`
    pub fn press(self, from: u32, to: u32) -> Self {
        self.set(from, Level::Low).set(to, Level::High)
    }

    /// Contact chatter: alternates low/high every `step` ms, starting and ending low
    pub fn chatter(mut self, from: u32, to: u32, step: u32) -> Self {
        let mut at = from;
        let mut level = Level::Low;
        while at < to {
            self = self.set(at, level);
            level = level.inverted();
            at += step;
        }
        self.set(to, Level::Low)
    }
}

impl RawInput for ScriptedLine {
    fn read_level(&self) -> Level {
        let offset = self.clock.now_ms().wrapping_sub(self.origin);
        self.steps
            .iter()
            .take_while(|(t, _)| *t <= offset)
            .last()
            .map(|(_, level)| *level)
            .unwrap_or(self.idle)
    }
}
