//! Status telemetry
//!
//! The controller publishes its [`FanStatus`] into a watch channel whenever it
//! changes. A [`StatusBroadcaster`] task serialises the latest value on its own
//! timer and hands it to a [`StatusSink`]. The timer is unrelated to button
//! timing; a slow sink never stalls the polling loop.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::fan::FanSpeed;

/// Observable fan state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanStatus {
    pub speed: FanSpeed,
}

impl FanStatus {
    pub fn power(&self) -> bool {
        self.speed.is_running()
    }
}

/// Serialised form sent to status consumers
#[derive(Clone, Debug, Serialize)]
pub struct StatusSnapshot {
    pub power: bool,
    pub speed: u8,
    pub device: String,
    pub timestamp: DateTime<Local>,
}

impl StatusSnapshot {
    pub fn capture(status: &FanStatus, device: &str) -> Self {
        Self {
            power: status.power(),
            speed: status.speed.as_u8(),
            device: device.to_string(),
            timestamp: Local::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub trait StatusSink: Send + 'static {
    fn publish(&mut self, payload: &str);
}

/// Sink that writes every snapshot to the log
#[derive(Debug, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn publish(&mut self, payload: &str) {
        info!("Status: {}", payload);
    }
}

pub struct StatusBroadcaster;

impl StatusBroadcaster {
    /// Publishes the latest status every `interval` until `cancel` fires
    pub fn spawn<S: StatusSink>(
        mut status_rx: watch::Receiver<FanStatus>,
        device: String,
        interval: Duration,
        mut sink: S,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        info!(
            "Starting status broadcaster with {}ms interval",
            interval.as_millis()
        );
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {}
                }

                let status = *status_rx.borrow_and_update();
                match StatusSnapshot::capture(&status, &device).to_json() {
                    Ok(payload) => sink.publish(&payload),
                    Err(e) => error!("Failed to serialize status: {}", e),
                }
            }
            debug!("Status broadcaster stopped");
        })
    }
}
