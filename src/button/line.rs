//! Raw input lines
//!
//! A line is anything that can report the electrical level of a single button
//! contact on demand. The gesture engine samples it; it never configures it.
//! Pull resistors and pin direction are set up once by whoever creates the line.

use rppal::gpio::{self, Gpio, InputPin};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Electrical level of an input line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl Default for Level {
    /// Buttons are wired against a pull-up, so the contact pulls the line low.
    fn default() -> Self {
        Level::Low
    }
}

impl From<gpio::Level> for Level {
    fn from(level: gpio::Level) -> Self {
        match level {
            gpio::Level::Low => Level::Low,
            gpio::Level::High => Level::High,
        }
    }
}

// Logical button state, independent of wiring polarity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Pressed,
    Released,
}

impl ButtonState {
    /// Interprets a raw level given the level that means "pressed"
    pub fn from_level(level: Level, active: Level) -> Self {
        if level == active {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

/// Source of raw samples for one button
pub trait RawInput: Send {
    fn read_level(&self) -> Level;
}

impl RawInput for InputPin {
    fn read_level(&self) -> Level {
        self.read().into()
    }
}

impl<T: RawInput + ?Sized> RawInput for Box<T> {
    fn read_level(&self) -> Level {
        (**self).read_level()
    }
}

/// Claims a GPIO pin as a button input.
///
/// The bias resistor pulls the line to the idle level, i.e. the opposite of
/// `active`.
pub fn open_button_pin(gpio: &Gpio, bcm_pin: u8, active: Level) -> Result<InputPin, gpio::Error> {
    let pin = gpio.get(bcm_pin)?;
    debug!("Claimed GPIO {} as button input (active {:?})", bcm_pin, active);
    Ok(match active {
        Level::Low => pin.into_input_pullup(),
        Level::High => pin.into_input_pulldown(),
    })
}
