//! Fan model: speed values, relay outputs and remote speed commands

pub mod command;
pub mod relay;
pub mod speed;

pub use command::{CommandError, FanCommand};
pub use relay::{GpioRelay, RelayError, RelayPins, SpeedRelay};
pub use speed::{FanSpeed, FanSpeedError};
