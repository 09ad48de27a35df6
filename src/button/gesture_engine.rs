//! Debounce and click recognition for a single push button
//!
//! The engine is advanced by [`GestureEngine::update`], called once per iteration
//! of the owner's polling loop. It never blocks there and keeps no background
//! work: every decision is a function of the current sample, the current time
//! and the stored state.
//!
//! # State machine
//!
//! ```text
//!            stable level                 click window
//!   Released ◄──────────► Pressed     Idle ─────────► Awaiting
//!             debounced edges          ▲  press edge     │
//!                                      │                 │ 2nd press edge ≤ window → DoubleClick
//!                                      └─────────────────┤
//!                                                        │ window expired       → SingleClick
//! ```
//!
//! Only debounced press edges drive the click logic; release edges and raw
//! (unconfirmed) transitions never raise events. Events stay pending until they
//! are consumed.
//!
//! # Polling rate
//!
//! The single-click timeout is only noticed when `update` runs, so the owner must
//! poll much faster than the double-click window. A gap longer than the window
//! delays single-click recognition by that gap.

use super::clock::{elapsed_ms, Clock};
use super::line::{ButtonState, Level, RawInput};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Timing parameters of a gesture engine.
///
/// Zero windows are accepted. A zero debounce window commits any level that
/// survives a single tick; a zero double-click window only pairs presses whose
/// edges land on the same millisecond. Choosing sane values is up to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// Quiet time (ms) a raw level must hold before it becomes the stable level
    pub debounce_ms: u32,

    /// Maximum time (ms) between two press edges that still forms a double click
    pub double_click_ms: u32,

    /// Wait (ms) between the two samples of a sustained-press confirmation
    pub confirm_ms: u32,

    /// Electrical level that means "pressed"
    pub active_level: Level,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 60,
            double_click_ms: 400,
            confirm_ms: 50,
            active_level: Level::Low,
        }
    }
}

/// A started sustained-press confirmation.
///
/// Created by [`GestureEngine::begin_confirmation`] and resolved by
/// [`GestureEngine::poll_confirmation`] once its deadline has passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Confirmation {
    started_ms: u32,
    wait_ms: u32,
}

impl Confirmation {
    pub fn started_ms(&self) -> u32 {
        self.started_ms
    }

    pub fn is_due(&self, now: u32) -> bool {
        elapsed_ms(now, self.started_ms) >= self.wait_ms
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    Rejected,
}

pub struct GestureEngine<L: RawInput> {
    line_id: String,
    line: L,
    settings: GestureSettings,

    // Debounce state
    last_raw: ButtonState,
    stable: ButtonState,
    last_change_ms: u32,

    // Click state
    last_press_ms: u32,
    awaiting_second_press: bool,

    // One-shot events
    single_click_pending: bool,
    double_click_pending: bool,
}

impl<L: RawInput> GestureEngine<L> {
    pub fn new(line_id: impl Into<String>, line: L, settings: GestureSettings) -> Self {
        Self {
            line_id: line_id.into(),
            line,
            settings,
            last_raw: ButtonState::Released,
            stable: ButtonState::Released,
            last_change_ms: 0,
            last_press_ms: 0,
            awaiting_second_press: false,
            single_click_pending: false,
            double_click_pending: false,
        }
    }

    /// Seeds the debounce state from the line as it is right now.
    ///
    /// Must run once before the first [`update`](Self::update). A button held
    /// during initialization is adopted as stable and does not produce a press
    /// edge.
    pub fn initialize(&mut self, clock: &dyn Clock) {
        let state = self.sample();
        self.last_raw = state;
        self.stable = state;
        self.last_change_ms = clock.now_ms();
        debug!("[{}] initialized as {:?}", self.line_id, state);
    }

    /// Advances the engine by one poll tick
    pub fn update(&mut self, clock: &dyn Clock) {
        let raw = self.sample();
        let now = clock.now_ms();

        // Every flip restarts the quiet period, not only the first one
        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_change_ms = now;
        }

        if elapsed_ms(now, self.last_change_ms) > self.settings.debounce_ms
            && self.stable != self.last_raw
        {
            self.stable = self.last_raw;
            if self.stable == ButtonState::Pressed {
                self.on_press_edge(now);
            }
        }

        if self.awaiting_second_press
            && elapsed_ms(now, self.last_press_ms) > self.settings.double_click_ms
        {
            self.awaiting_second_press = false;
            self.single_click_pending = true;
            debug!("[{}] single click at {}ms", self.line_id, now);
        }
    }

    fn on_press_edge(&mut self, now: u32) {
        if self.awaiting_second_press
            && elapsed_ms(now, self.last_press_ms) <= self.settings.double_click_ms
        {
            self.awaiting_second_press = false;
            self.double_click_pending = true;
            debug!(
                "[{}] double click at {}ms ({}ms after first press)",
                self.line_id,
                now,
                elapsed_ms(now, self.last_press_ms)
            );
        } else {
            // First press of a pair, or too late to pair with a stale one
            self.awaiting_second_press = true;
            self.last_press_ms = now;
            debug!("[{}] press edge at {}ms", self.line_id, now);
        }
    }

    /// Returns true once per recognised single click
    pub fn consume_single_click(&mut self) -> bool {
        std::mem::take(&mut self.single_click_pending)
    }

    /// Returns true once per recognised double click
    pub fn consume_double_click(&mut self) -> bool {
        std::mem::take(&mut self.double_click_pending)
    }

    /// Checks that the button is held now and still held `confirm_ms` later.
    ///
    /// Blocks the calling thread for the whole wait when the first sample is
    /// pressed; returns false right away otherwise. Nothing else is polled in the
    /// meantime, so callers that serve other inputs should use
    /// [`begin_confirmation`](Self::begin_confirmation) instead.
    pub fn confirm_sustained_press(&mut self, clock: &dyn Clock) -> bool {
        let Some(confirmation) = self.begin_confirmation(clock) else {
            return false;
        };
        clock.delay_ms(self.settings.confirm_ms);
        self.poll_confirmation(&confirmation, clock) == ConfirmationStatus::Confirmed
    }

    /// First half of a non-blocking confirmation.
    ///
    /// `None` means the line is not pressed, which is an immediate rejection.
    pub fn begin_confirmation(&mut self, clock: &dyn Clock) -> Option<Confirmation> {
        if self.sample() != ButtonState::Pressed {
            debug!("[{}] confirmation rejected: not pressed", self.line_id);
            return None;
        }
        Some(Confirmation {
            started_ms: clock.now_ms(),
            wait_ms: self.settings.confirm_ms,
        })
    }

    /// Second half of a non-blocking confirmation.
    ///
    /// Stays `Pending` until the wait has elapsed, then takes the second sample.
    /// Releases inside the wait are not observed.
    pub fn poll_confirmation(
        &mut self,
        confirmation: &Confirmation,
        clock: &dyn Clock,
    ) -> ConfirmationStatus {
        if !confirmation.is_due(clock.now_ms()) {
            return ConfirmationStatus::Pending;
        }
        if self.sample() == ButtonState::Pressed {
            debug!("[{}] sustained press confirmed", self.line_id);
            ConfirmationStatus::Confirmed
        } else {
            debug!("[{}] confirmation rejected: released", self.line_id);
            ConfirmationStatus::Rejected
        }
    }

    pub fn line_id(&self) -> &str {
        &self.line_id
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    /// Debounced state
    pub fn stable_state(&self) -> ButtonState {
        self.stable
    }

    pub fn is_awaiting_second_press(&self) -> bool {
        self.awaiting_second_press
    }

    fn sample(&self) -> ButtonState {
        ButtonState::from_level(self.line.read_level(), self.settings.active_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::sim::{ScriptedLine, SimClock};

    const DEBOUNCE: u32 = 60;
    const WINDOW: u32 = 400;

    fn armed(clock: &SimClock, line: ScriptedLine) -> GestureEngine<ScriptedLine> {
        let mut engine = GestureEngine::new("test", line, GestureSettings::default());
        engine.initialize(clock);
        engine
    }

    /// Ticks once per millisecond until `offset` (inclusive) after `start`
    fn run_until(
        engine: &mut GestureEngine<ScriptedLine>,
        clock: &SimClock,
        start: u32,
        offset: u32,
    ) {
        while elapsed_ms(clock.now_ms(), start) < offset {
            clock.advance(1);
            engine.update(clock);
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Tally {
        single: usize,
        double: usize,
    }

    fn run_and_tally(
        engine: &mut GestureEngine<ScriptedLine>,
        clock: &SimClock,
        start: u32,
        offset: u32,
    ) -> Tally {
        let mut tally = Tally::default();
        while elapsed_ms(clock.now_ms(), start) < offset {
            clock.advance(1);
            engine.update(clock);
            tally.single += engine.consume_single_click() as usize;
            tally.double += engine.consume_double_click() as usize;
        }
        tally
    }

    #[test]
    fn defaults_are_60_400_50_active_low() {
        let settings = GestureSettings::default();
        assert_eq!(settings.debounce_ms, DEBOUNCE);
        assert_eq!(settings.double_click_ms, WINDOW);
        assert_eq!(settings.confirm_ms, 50);
        assert_eq!(settings.active_level, Level::Low);
    }

    #[test]
    fn stable_level_waits_for_quiet_period_after_last_bounce() {
        let clock = SimClock::default();
        // chatter until 40ms, then held low until 500ms
        let line = ScriptedLine::new(&clock).chatter(10, 40, 5).set(500, Level::High);
        let mut engine = armed(&clock, line);

        run_until(&mut engine, &clock, 0, 40 + DEBOUNCE);
        assert_eq!(engine.stable_state(), ButtonState::Released);

        run_until(&mut engine, &clock, 0, 40 + DEBOUNCE + 1);
        assert_eq!(engine.stable_state(), ButtonState::Pressed);
        assert!(engine.is_awaiting_second_press());
    }

    #[test]
    fn short_glitches_never_commit() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock)
            .press(10, 40)
            .press(100, 150)
            .press(300, 355);
        let mut engine = armed(&clock, line);

        let tally = run_and_tally(&mut engine, &clock, 0, 2000);
        assert_eq!(engine.stable_state(), ButtonState::Released);
        assert_eq!(tally, Tally::default());
    }

    #[test]
    fn isolated_press_yields_one_single_click_after_window() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 160);
        let mut engine = armed(&clock, line);
        let edge = 10 + DEBOUNCE + 1;

        run_until(&mut engine, &clock, 0, edge + WINDOW);
        assert!(!engine.consume_single_click());
        assert!(engine.is_awaiting_second_press());

        run_until(&mut engine, &clock, 0, edge + WINDOW + 1);
        assert!(engine.consume_single_click());
        assert!(!engine.consume_double_click());
        assert!(!engine.is_awaiting_second_press());

        let rest = run_and_tally(&mut engine, &clock, 0, 3000);
        assert_eq!(rest, Tally::default());
    }

    #[test]
    fn held_press_scenario_fires_single_click_at_window_end() {
        // Pressed with chatter from 0, held until 500
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock)
            .chatter(1, 5, 1)
            .set(500, Level::High);
        let mut engine = armed(&clock, line);
        let edge = 5 + DEBOUNCE + 1;

        run_until(&mut engine, &clock, 0, edge);
        assert_eq!(engine.stable_state(), ButtonState::Pressed);
        assert!(engine.is_awaiting_second_press());

        run_until(&mut engine, &clock, 0, edge + WINDOW + 1);
        assert!(engine.consume_single_click());
    }

    #[test]
    fn presses_inside_window_form_one_double_click() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 100).press(210, 400);
        let mut engine = armed(&clock, line);
        let second_edge = 210 + DEBOUNCE + 1;

        run_until(&mut engine, &clock, 0, second_edge - 1);
        assert!(!engine.consume_double_click());

        run_until(&mut engine, &clock, 0, second_edge);
        assert!(!engine.is_awaiting_second_press());
        assert!(engine.consume_double_click());

        let rest = run_and_tally(&mut engine, &clock, 0, 3000);
        assert_eq!(rest, Tally::default());
    }

    #[test]
    fn press_edges_exactly_one_window_apart_still_pair() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 100).press(10 + WINDOW, 600);
        let mut engine = armed(&clock, line);

        let tally = run_and_tally(&mut engine, &clock, 0, 2000);
        assert_eq!(tally, Tally { single: 0, double: 1 });
    }

    #[test]
    fn presses_outside_window_form_two_single_clicks() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 100).press(700, 800);
        let mut engine = armed(&clock, line);

        let first = run_and_tally(&mut engine, &clock, 0, 10 + DEBOUNCE + 1 + WINDOW + 1);
        assert_eq!(first, Tally { single: 1, double: 0 });

        let second = run_and_tally(&mut engine, &clock, 0, 3000);
        assert_eq!(second, Tally { single: 1, double: 0 });
    }

    #[test]
    fn consuming_clears_the_event() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 100);
        let mut engine = armed(&clock, line);

        run_until(&mut engine, &clock, 0, 1000);
        assert!(engine.consume_single_click());
        assert!(!engine.consume_single_click());

        engine.update(&clock);
        assert!(!engine.consume_single_click());
    }

    #[test]
    fn unread_events_from_separate_sequences_coexist() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock)
            .press(10, 100)
            .press(700, 800)
            .press(900, 1000);
        let mut engine = armed(&clock, line);

        run_until(&mut engine, &clock, 0, 2000);
        assert!(engine.consume_single_click());
        assert!(engine.consume_double_click());
    }

    #[test]
    fn button_held_at_startup_is_not_a_press() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(0, 300);
        let mut engine = armed(&clock, line);
        assert_eq!(engine.stable_state(), ButtonState::Pressed);

        let tally = run_and_tally(&mut engine, &clock, 0, 2000);
        assert_eq!(tally, Tally::default());
        assert_eq!(engine.stable_state(), ButtonState::Released);
    }

    #[test]
    fn click_timing_survives_clock_wraparound() {
        let start = u32::MAX - 100;
        let clock = SimClock::starting_at(start);
        let line = ScriptedLine::new(&clock).press(10, 100).press(210, 300);
        let mut engine = armed(&clock, line);

        let tally = run_and_tally(&mut engine, &clock, start, 2000);
        assert_eq!(tally, Tally { single: 0, double: 1 });

        let line = ScriptedLine::new(&clock).press(10, 100);
        let mut engine = armed(&clock, line);
        let restart = clock.now_ms();
        let tally = run_and_tally(&mut engine, &clock, restart, 1000);
        assert_eq!(tally, Tally { single: 1, double: 0 });
    }

    #[test]
    fn active_high_lines_are_supported() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).set(0, Level::Low).set(10, Level::High).set(100, Level::Low);
        let settings = GestureSettings {
            active_level: Level::High,
            ..GestureSettings::default()
        };
        let mut engine = GestureEngine::new("active-high", line, settings);
        engine.initialize(&clock);

        run_until(&mut engine, &clock, 0, 1000);
        assert!(engine.consume_single_click());
    }

    #[test]
    fn confirmation_rejects_immediately_when_not_pressed() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(100, 200);
        let mut engine = armed(&clock, line);

        assert!(!engine.confirm_sustained_press(&clock));
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn confirmation_accepts_press_held_through_wait() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 500);
        let mut engine = armed(&clock, line);

        clock.advance(20);
        assert!(engine.confirm_sustained_press(&clock));
        assert_eq!(clock.now_ms(), 70);
    }

    #[test]
    fn confirmation_rejects_release_during_wait() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 40);
        let mut engine = armed(&clock, line);

        clock.advance(20);
        assert!(!engine.confirm_sustained_press(&clock));
    }

    #[test]
    fn deferred_confirmation_resolves_at_deadline() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 500);
        let mut engine = armed(&clock, line);

        clock.advance(20);
        let confirmation = engine
            .begin_confirmation(&clock)
            .expect("line is pressed");
        assert_eq!(confirmation.started_ms(), 20);

        clock.advance(49);
        assert_eq!(
            engine.poll_confirmation(&confirmation, &clock),
            ConfirmationStatus::Pending
        );

        clock.advance(1);
        assert_eq!(
            engine.poll_confirmation(&confirmation, &clock),
            ConfirmationStatus::Confirmed
        );
    }

    #[test]
    fn confirmation_does_not_touch_click_state() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 100).press(210, 600);
        let mut engine = armed(&clock, line);

        run_until(&mut engine, &clock, 0, 280);
        assert!(engine.confirm_sustained_press(&clock));
        assert!(engine.consume_double_click());
        assert!(!engine.consume_single_click());
    }

    #[test]
    fn zero_debounce_commits_on_next_tick() {
        let clock = SimClock::default();
        let line = ScriptedLine::new(&clock).press(10, 100);
        let settings = GestureSettings {
            debounce_ms: 0,
            ..GestureSettings::default()
        };
        let mut engine = GestureEngine::new("raw", line, settings);
        engine.initialize(&clock);

        run_until(&mut engine, &clock, 0, 10);
        assert_eq!(engine.stable_state(), ButtonState::Released);
        run_until(&mut engine, &clock, 0, 11);
        assert_eq!(engine.stable_state(), ButtonState::Pressed);
    }
}
