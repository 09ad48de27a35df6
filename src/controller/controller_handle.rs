//! Controller Handle - wiring the fan controller to real hardware
//!
//! Opens the button inputs and relay outputs described by [`AppConfig`], builds
//! a [`FanController`] around them and drives it on a blocking thread. The
//! polling loop sleeps between iterations, so it must never run on an async
//! worker thread.

use std::sync::Arc;

use rppal::gpio::Gpio;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::fan_controller::{
    ButtonBank, ButtonEngine, ControllerChannels, ControllerExit, FanController,
};
use crate::button::{line::open_button_pin, GestureEngine, MonotonicClock, RawInput};
use crate::config::AppConfig;
use crate::fan::{FanCommand, FanSpeed, GpioRelay, RelayError};

/// Errors that can occur during controller initialization or operation
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The GPIO peripheral could not be opened
    ///
    /// Usually means the process is not running on a Raspberry Pi or lacks
    /// access to `/dev/gpiomem`.
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Button pin {pin} unavailable: {source}")]
    ButtonPin {
        pin: u8,
        #[source]
        source: rppal::gpio::Error,
    },

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// The blocking controller thread panicked or was aborted
    #[error("Controller task failed: {0}")]
    TaskFailed(String),
}

/// Handle for a controller running on its own blocking thread
///
/// # Threading Model
///
/// ```text
/// stdin reader ─[FanCommand]→ FanController ─[FanStatus]→ StatusBroadcaster
///                                  │
///                                  └─[SettingsAction]→ PersistenceManager
/// ```
///
/// The controller owns the GPIO lines. They are released when the thread
/// returns, so a new handle can be spawned after [`join`](Self::join).
pub struct ControllerHandle {
    task: JoinHandle<(ControllerExit, mpsc::Receiver<FanCommand>)>,
}

impl ControllerHandle {
    /// Opens the hardware and starts the controller loop
    ///
    /// `restored` is applied to the relays before the first poll.
    ///
    /// # Errors
    ///
    /// * [`ControllerError::Gpio`] - no GPIO peripheral
    /// * [`ControllerError::ButtonPin`] - a button pin is already claimed
    /// * [`ControllerError::Relay`] - a relay pin is already claimed
    pub fn spawn(
        config: &AppConfig,
        restored: FanSpeed,
        channels: ControllerChannels,
        cancel: CancellationToken,
    ) -> Result<Self, ControllerError> {
        info!("Initializing fan controller");
        let gpio = Gpio::new()?;

        let active = config.gestures.active_level;
        let open = |name: &str, pin: u8| -> Result<ButtonEngine, ControllerError> {
            let input = open_button_pin(&gpio, pin, active)
                .map_err(|source| ControllerError::ButtonPin { pin, source })?;
            debug!("Button {} on GPIO {}", name, pin);
            let line: Box<dyn RawInput> = Box::new(input);
            Ok(GestureEngine::new(name, line, config.gestures))
        };

        let pins = &config.buttons;
        let buttons = ButtonBank {
            power: open("power", pins.power)?,
            speed1: open("speed1", pins.speed1)?,
            speed2: open("speed2", pins.speed2)?,
            speed3: open("speed3", pins.speed3)?,
        };
        let relay = GpioRelay::open(&gpio, &config.relays)?;
        info!("GPIO lines claimed");

        let controller = FanController::create(
            config.controller.clone(),
            Arc::new(MonotonicClock::new()),
            buttons,
            Box::new(relay),
            channels,
        );

        let task = tokio::task::spawn_blocking(move || {
            let mut running = controller.initialize(restored);
            let exit = running.run(&cancel);
            (exit, running.into_command_receiver())
        });

        info!("Fan controller spawned successfully");
        Ok(Self { task })
    }

    /// Waits for the controller loop to end
    ///
    /// Returns why it stopped together with the command receiver, ready to be
    /// handed to the next controller.
    pub async fn join(
        self,
    ) -> Result<(ControllerExit, mpsc::Receiver<FanCommand>), ControllerError> {
        self.task.await.map_err(|e| {
            error!("Controller task failed: {}", e);
            ControllerError::TaskFailed(e.to_string())
        })
    }
}
