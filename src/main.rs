pub mod button;
pub mod config;
pub mod controller;
pub mod fan;
pub mod persistence;
pub mod telemetry;

use crate::config::AppConfig;
use crate::controller::{ControllerChannels, ControllerExit, ControllerHandle};
use crate::fan::FanCommand;
use crate::persistence::{PersistenceManager, SettingsStore};
use crate::telemetry::{FanStatus, LogStatusSink, StatusBroadcaster};
use color_eyre::{eyre::eyre, Result};
use std::io::BufRead;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = config::config_path();
    let config = AppConfig::load_or_create(&config_path)?;
    info!(
        "Starting {} with configuration from {}",
        config.device_name(),
        config_path.display()
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        shutdown.cancel();
    });

    let (command_tx, mut command_rx) = mpsc::channel(32);
    spawn_command_reader(command_tx);

    loop {
        let store = match &config.settings_dir {
            Some(dir) => SettingsStore::in_dir(dir),
            None => SettingsStore::default_location(),
        };
        let restored = store.load_or_default().await.last_speed;
        let persistence = PersistenceManager::spawn(store);

        let run_cancel = cancel.child_token();
        let (status_tx, status_rx) = watch::channel(FanStatus { speed: restored });
        let broadcaster = StatusBroadcaster::spawn(
            status_rx,
            config.device_name().to_string(),
            Duration::from_millis(config.controller.status_interval_ms),
            LogStatusSink,
            run_cancel.clone(),
        );

        let channels = ControllerChannels {
            status_tx,
            settings_tx: persistence.get_sender(),
            command_rx,
        };
        let handle = ControllerHandle::spawn(&config, restored, channels, run_cancel.clone())
            .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;

        let (exit, returned_rx) = handle.join().await?;
        command_rx = returned_rx;

        run_cancel.cancel();
        if let Err(e) = broadcaster.await {
            error!("Status broadcaster panicked: {}", e);
        }
        persistence.shutdown().await;

        match exit {
            ControllerExit::Shutdown => break,
            ControllerExit::FactoryReset => {
                warn!("Factory reset complete, restarting with defaults");
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Reads JSON speed commands from stdin, one per line.
///
/// Runs on a plain thread: blocking stdin reads would otherwise hold up
/// runtime shutdown.
fn spawn_command_reader(command_tx: mpsc::Sender<FanCommand>) {
    let spawned = std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to read command: {}", e);
                        break;
                    }
                };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }

                match FanCommand::parse(text) {
                    Ok(command) => {
                        debug!("Received command {:?}", command);
                        if command_tx.blocking_send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring command {:?}: {}", text, e),
                }
            }
            debug!("Command reader stopped");
        });

    if let Err(e) = spawned {
        error!("Failed to start command reader: {}", e);
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
