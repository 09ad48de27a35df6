//! Fan controller subsystem
//!
//! 1. [`fan_controller`] - gesture to speed mapping, lockout and factory reset
//! 2. [`controller_handle`] - hardware setup and thread lifecycle
//!
//! # Architecture
//!
//! ```text
//! Buttons ──► GestureEngine ×4 ──► FanController ──► SpeedRelay
//!                                     ▲    │
//!                        FanCommand ──┘    └──► FanStatus / SettingsAction
//! ```
//!
//! The controller polls every 2ms by default, well inside the debounce and
//! double-click windows.

pub mod controller_handle;
pub mod fan_controller;

pub use controller_handle::{ControllerError, ControllerHandle};
pub use fan_controller::{ControllerChannels, ControllerExit, FanController};
