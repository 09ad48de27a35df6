//! Button input subsystem
//!
//! Turns bouncy push-button contacts into click events for the fan controller:
//!
//! 1. [`line`] - raw electrical samples (GPIO pins or test doubles)
//! 2. [`clock`] - wrapping millisecond time source
//! 3. [`gesture_engine`] - debounce, single/double click and sustained-press checks
//!
//! # Architecture
//!
//! ```text
//! RawInput ──► GestureEngine ──► consume_single_click / consume_double_click
//!  (Level)      (per line)        confirm_sustained_press
//!                   ▲
//!                 Clock
//! ```
//!
//! Engines are polled from one thread and share nothing with each other.

pub mod clock;
pub mod gesture_engine;
pub mod line;

#[cfg(test)]
pub mod sim;

pub use clock::{elapsed_ms, Clock, MonotonicClock};
pub use gesture_engine::{Confirmation, ConfirmationStatus, GestureEngine, GestureSettings};
pub use line::{ButtonState, Level, RawInput};
