//! Fan controller: turns click events into fan speed changes
//!
//! Owns one [`GestureEngine`] per button, the relay outputs and the current
//! speed. Everything runs from a single polling loop; the only cross-thread
//! traffic goes through channels (settings to the persistence worker, status to
//! the broadcaster, remote commands in).
//!
//! # Button bindings
//!
//! Evaluated in this order on every poll, first match wins:
//!
//! | Button  | Gesture      | Action          |
//! |---------|--------------|-----------------|
//! | speed 3 | double click | factory reset   |
//! | speed 1 | double click | fan off         |
//! | speed 1 | single click | speed 1         |
//! | speed 2 | single click | speed 2         |
//! | speed 3 | single click | speed 3         |
//! | power   | single click | toggle on/off   |
//!
//! Each event must be backed by a sustained press. The event is consumed first,
//! then the line is sampled; if it is not held the event is dropped and the
//! next binding is tried. If it is held, the second sample is taken
//! `confirm_ms` later on a subsequent poll, so the other buttons keep being
//! debounced meanwhile. While a confirmation is in flight, or during the lockout
//! after a speed change, no further events are consumed; they stay pending in
//! their engines.

use crate::button::{
    elapsed_ms, Clock, Confirmation, ConfirmationStatus, GestureEngine, RawInput,
};
use crate::config::ControllerSettings;
use crate::fan::{FanCommand, FanSpeed, SpeedRelay};
use crate::persistence::SettingsAction;
use crate::telemetry::FanStatus;
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub type ButtonEngine = GestureEngine<Box<dyn RawInput>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Power,
    Speed1,
    Speed2,
    Speed3,
}

/// The four monitored buttons
pub struct ButtonBank {
    pub power: ButtonEngine,
    pub speed1: ButtonEngine,
    pub speed2: ButtonEngine,
    pub speed3: ButtonEngine,
}

impl ButtonBank {
    pub fn get_mut(&mut self, id: ButtonId) -> &mut ButtonEngine {
        match id {
            ButtonId::Power => &mut self.power,
            ButtonId::Speed1 => &mut self.speed1,
            ButtonId::Speed2 => &mut self.speed2,
            ButtonId::Speed3 => &mut self.speed3,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ButtonEngine> {
        [
            &mut self.power,
            &mut self.speed1,
            &mut self.speed2,
            &mut self.speed3,
        ]
        .into_iter()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    SingleClick,
    DoubleClick,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    SetSpeed(FanSpeed),
    TogglePower,
    FactoryReset,
}

const BINDINGS: [(ButtonId, Gesture, ButtonAction); 6] = [
    (ButtonId::Speed3, Gesture::DoubleClick, ButtonAction::FactoryReset),
    (
        ButtonId::Speed1,
        Gesture::DoubleClick,
        ButtonAction::SetSpeed(FanSpeed::Off),
    ),
    (
        ButtonId::Speed1,
        Gesture::SingleClick,
        ButtonAction::SetSpeed(FanSpeed::Low),
    ),
    (
        ButtonId::Speed2,
        Gesture::SingleClick,
        ButtonAction::SetSpeed(FanSpeed::Medium),
    ),
    (
        ButtonId::Speed3,
        Gesture::SingleClick,
        ButtonAction::SetSpeed(FanSpeed::High),
    ),
    (ButtonId::Power, Gesture::SingleClick, ButtonAction::TogglePower),
];

#[derive(Clone, Copy, Debug)]
struct PendingAction {
    button: ButtonId,
    gesture: Gesture,
    action: ButtonAction,
    confirmation: Confirmation,
}

/// Why the controller loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerExit {
    /// Cancelled from outside
    Shutdown,
    /// Settings were wiped; the stack should be rebuilt from defaults
    FactoryReset,
}

/// Channel endpoints the controller talks through
pub struct ControllerChannels {
    pub status_tx: watch::Sender<FanStatus>,
    pub settings_tx: mpsc::Sender<SettingsAction>,
    pub command_rx: mpsc::Receiver<FanCommand>,
}

#[state]
#[derive(Debug, Clone)]
pub enum ControllerState {
    Initializing,
    Running,
}

#[machine]
pub struct FanController<S: ControllerState> {
    settings: ControllerSettings,
    clock: Arc<dyn Clock>,
    buttons: ButtonBank,
    relay: Box<dyn SpeedRelay>,
    channels: ControllerChannels,

    speed: FanSpeed,
    last_running_speed: FanSpeed,
    last_action_ms: Option<u32>,
    pending: Option<PendingAction>,
}

// Available in all states
impl<S: ControllerState> FanController<S> {
    pub fn speed(&self) -> FanSpeed {
        self.speed
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    fn set_speed(&mut self, speed: FanSpeed) {
        info!("Fan speed {} -> {}", self.speed, speed);
        self.relay.apply(speed);
        self.speed = speed;
        if speed.is_running() {
            self.last_running_speed = speed;
        }

        if let Err(e) = self
            .channels
            .settings_tx
            .try_send(SettingsAction::StoreSpeed { speed })
        {
            warn!("Could not queue speed for persistence: {}", e);
        }
        self.channels.status_tx.send_replace(FanStatus { speed });
    }
}

impl FanController<Initializing> {
    pub fn create(
        settings: ControllerSettings,
        clock: Arc<dyn Clock>,
        buttons: ButtonBank,
        relay: Box<dyn SpeedRelay>,
        channels: ControllerChannels,
    ) -> Self {
        debug!("Creating FanController with settings: {:?}", settings);
        Self::new(
            settings,
            clock,
            buttons,
            relay,
            channels,
            FanSpeed::Off, // speed
            FanSpeed::Low, // last_running_speed
            None,          // last_action_ms
            None,          // pending
        )
    }

    /// Seeds every button engine and restores the persisted speed
    pub fn initialize(mut self, restored: FanSpeed) -> FanController<Running> {
        let clock = self.clock.clone();
        for engine in self.buttons.iter_mut() {
            engine.initialize(clock.as_ref());
        }

        info!("Restoring fan speed {}", restored);
        self.set_speed(restored);

        info!("FanController initialized, transitioning to Running state");
        self.transition()
    }
}

impl FanController<Running> {
    /// One iteration of the control loop. Never blocks, except for the
    /// acknowledgement wait of a factory reset.
    pub fn poll(&mut self) -> Option<ControllerExit> {
        let clock = self.clock.clone();
        for engine in self.buttons.iter_mut() {
            engine.update(clock.as_ref());
        }

        self.drain_commands();
        self.handle_buttons(clock.as_ref())
    }

    /// Polls until cancelled or until a button asks for a restart
    pub fn run(&mut self, cancel: &CancellationToken) -> ControllerExit {
        let interval = Duration::from_millis(self.settings.poll_interval_ms);
        info!(
            "Starting controller loop with {}ms poll interval",
            self.settings.poll_interval_ms
        );

        // Stats for performance monitoring
        let stats_interval_ms = 30_000;
        let mut polls: u64 = 0;
        let mut last_stats_ms = self.clock.now_ms();

        loop {
            if cancel.is_cancelled() {
                info!("Controller loop cancelled");
                return ControllerExit::Shutdown;
            }

            if let Some(exit) = self.poll() {
                info!("Controller loop exiting: {:?}", exit);
                return exit;
            }
            polls += 1;

            let now = self.clock.now_ms();
            let since_stats = elapsed_ms(now, last_stats_ms);
            if since_stats > stats_interval_ms {
                debug!(
                    "Controller stats: {} polls in {} ms (avg {:.2}/sec)",
                    polls,
                    since_stats,
                    polls as f64 * 1000.0 / f64::from(since_stats)
                );
                polls = 0;
                last_stats_ms = now;
            }

            std::thread::sleep(interval);
        }
    }

    /// Tears the controller down, releasing buttons and relays, and hands back
    /// the command receiver so a rebuilt controller can keep serving it
    pub fn into_command_receiver(self) -> mpsc::Receiver<FanCommand> {
        self.channels.command_rx
    }

    pub fn is_locked_out(&self, now: u32) -> bool {
        self.last_action_ms
            .is_some_and(|at| elapsed_ms(now, at) < self.settings.action_lockout_ms)
    }

    fn drain_commands(&mut self) {
        loop {
            let command = match self.channels.command_rx.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };

            match command.target(self.speed) {
                Ok(speed) => {
                    info!("Remote command {:?}", command);
                    self.set_speed(speed);
                }
                Err(e) => warn!("Ignoring remote command {:?}: {}", command, e),
            }
        }
    }

    fn handle_buttons(&mut self, clock: &dyn Clock) -> Option<ControllerExit> {
        let now = clock.now_ms();

        if let Some(pending) = self.pending.take() {
            let engine = self.buttons.get_mut(pending.button);
            match engine.poll_confirmation(&pending.confirmation, clock) {
                ConfirmationStatus::Pending => {
                    self.pending = Some(pending);
                    return None;
                }
                ConfirmationStatus::Confirmed => {
                    info!(
                        "{:?} {:?} confirmed -> {:?}",
                        pending.button, pending.gesture, pending.action
                    );
                    return self.execute(pending.action, now);
                }
                ConfirmationStatus::Rejected => {
                    debug!(
                        "{:?} {:?} dropped: released before confirmation",
                        pending.button, pending.gesture
                    );
                }
            }
        }

        if self.is_locked_out(now) {
            return None;
        }

        for (button, gesture, action) in BINDINGS {
            let engine = self.buttons.get_mut(button);
            let fired = match gesture {
                Gesture::SingleClick => engine.consume_single_click(),
                Gesture::DoubleClick => engine.consume_double_click(),
            };
            if !fired {
                continue;
            }

            match engine.begin_confirmation(clock) {
                Some(confirmation) => {
                    debug!("{:?} {:?} awaiting confirmation", button, gesture);
                    self.pending = Some(PendingAction {
                        button,
                        gesture,
                        action,
                        confirmation,
                    });
                    return None;
                }
                None => debug!("{:?} {:?} dropped: button not held", button, gesture),
            }
        }

        None
    }

    fn execute(&mut self, action: ButtonAction, now: u32) -> Option<ControllerExit> {
        match action {
            ButtonAction::SetSpeed(speed) => {
                self.change_speed(speed, now);
                None
            }
            ButtonAction::TogglePower => {
                let target = if self.speed.is_running() {
                    FanSpeed::Off
                } else {
                    self.last_running_speed
                };
                self.change_speed(target, now);
                None
            }
            ButtonAction::FactoryReset => Some(self.factory_reset()),
        }
    }

    fn change_speed(&mut self, speed: FanSpeed, now: u32) {
        if speed == self.speed {
            debug!("Fan already at {}", speed);
            return;
        }
        self.last_action_ms = Some(now);
        self.set_speed(speed);
    }

    fn factory_reset(&mut self) -> ControllerExit {
        warn!("Factory reset requested - clearing settings");

        let (response_tx, response_rx) = oneshot::channel();
        match self
            .channels
            .settings_tx
            .blocking_send(SettingsAction::Clear { response_tx })
        {
            Ok(()) => match response_rx.blocking_recv() {
                Ok(Ok(())) => info!("Settings cleared"),
                Ok(Err(e)) => error!("Failed to clear settings: {}", e),
                Err(_) => error!("Persistence worker dropped the clear request"),
            },
            Err(e) => error!("Persistence worker unavailable: {}", e),
        }

        self.relay.apply(FanSpeed::Off);
        self.speed = FanSpeed::Off;
        self.channels.status_tx.send_replace(FanStatus {
            speed: FanSpeed::Off,
        });
        ControllerExit::FactoryReset
    }
}
