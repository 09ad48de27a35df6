//! Remote speed commands
//!
//! Text messages of the form `{"POWER": true, "SPEED": 2}`. `POWER` is required;
//! `SPEED` falls back to the current speed when absent.

use super::{FanSpeed, FanSpeedError};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct FanCommand {
    #[serde(rename = "POWER")]
    pub power: bool,
    #[serde(rename = "SPEED", default)]
    pub speed: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidSpeed(#[from] FanSpeedError),
}

impl FanCommand {
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Speed this command asks for, given the speed currently running
    pub fn target(&self, current: FanSpeed) -> Result<FanSpeed, CommandError> {
        if !self.power {
            return Ok(FanSpeed::Off);
        }
        match self.speed {
            Some(speed) => Ok(FanSpeed::try_from(speed)?),
            None => Ok(current),
        }
    }
}
