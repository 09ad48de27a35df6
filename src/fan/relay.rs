//! Relay outputs selecting the fan speed
//!
//! One power relay plus one relay per speed tap. Speed taps are mutually
//! exclusive: every change drops all taps before raising the new one, so two
//! windings are never energised at once.

use super::FanSpeed;
use rppal::gpio::{self, Gpio, OutputPin};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub trait SpeedRelay: Send {
    fn apply(&mut self, speed: FanSpeed);
}

impl<T: SpeedRelay + ?Sized> SpeedRelay for Box<T> {
    fn apply(&mut self, speed: FanSpeed) {
        (**self).apply(speed)
    }
}

/// BCM pin numbers of the relay board
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayPins {
    pub power: u8,
    pub speed1: u8,
    pub speed2: u8,
    pub speed3: u8,
}

impl Default for RelayPins {
    fn default() -> Self {
        Self {
            power: 5,
            speed1: 6,
            speed2: 13,
            speed3: 19,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Failed to claim relay pin {pin}: {source}")]
    PinUnavailable {
        pin: u8,
        #[source]
        source: gpio::Error,
    },
}

pub struct GpioRelay {
    power: OutputPin,
    speeds: [OutputPin; 3],
}

impl GpioRelay {
    /// Claims all relay pins, starting with everything switched off
    pub fn open(gpio: &Gpio, pins: &RelayPins) -> Result<Self, RelayError> {
        let claim = |pin: u8| -> Result<OutputPin, RelayError> {
            gpio.get(pin)
                .map(|p| p.into_output_low())
                .map_err(|source| RelayError::PinUnavailable { pin, source })
        };

        let relay = Self {
            power: claim(pins.power)?,
            speeds: [claim(pins.speed1)?, claim(pins.speed2)?, claim(pins.speed3)?],
        };
        info!("Relay board ready: {:?}", pins);
        Ok(relay)
    }
}

impl SpeedRelay for GpioRelay {
    fn apply(&mut self, speed: FanSpeed) {
        for pin in self.speeds.iter_mut() {
            pin.set_low();
        }

        match speed {
            FanSpeed::Off => self.power.set_low(),
            running => {
                self.power.set_high();
                let tap = usize::from(running.as_u8()) - 1;
                self.speeds[tap].set_high();
            }
        }
        debug!("Relays switched to {}", speed);
    }
}
