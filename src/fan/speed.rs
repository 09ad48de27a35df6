use serde::{Deserialize, Serialize};
use std::fmt;

// Relay-selected fan speed; 0 means the fan is powered off
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FanSpeed {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FanSpeedError {
    #[error("Fan speed out of range: {0} (expected 0-3)")]
    OutOfRange(i64),
}

impl FanSpeed {
    pub fn is_running(self) -> bool {
        self != FanSpeed::Off
    }

    pub fn as_u8(self) -> u8 {
        match self {
            FanSpeed::Off => 0,
            FanSpeed::Low => 1,
            FanSpeed::Medium => 2,
            FanSpeed::High => 3,
        }
    }
}

impl TryFrom<u8> for FanSpeed {
    type Error = FanSpeedError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for FanSpeed {
    type Error = FanSpeedError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FanSpeed::Off),
            1 => Ok(FanSpeed::Low),
            2 => Ok(FanSpeed::Medium),
            3 => Ok(FanSpeed::High),
            other => Err(FanSpeedError::OutOfRange(other)),
        }
    }
}

impl From<FanSpeed> for u8 {
    fn from(speed: FanSpeed) -> Self {
        speed.as_u8()
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanSpeed::Off => write!(f, "Off"),
            FanSpeed::Low => write!(f, "Low"),
            FanSpeed::Medium => write!(f, "Medium"),
            FanSpeed::High => write!(f, "High"),
        }
    }
}
