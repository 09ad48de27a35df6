use super::{FanSettings, SettingsStore};
use crate::fan::FanSpeed;
use color_eyre::Result;
use tokio::sync::mpsc::{channel, Sender};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

macro_rules! handle_action {
    ($action:expr, $response_tx:expr) => {
        if $response_tx.send($action.await).is_err() {
            error!("Failed to send response");
        }
    };
}

pub struct PersistenceManager {
    tx: Sender<SettingsAction>,
    worker_handle: tokio::task::JoinHandle<()>,
}

impl PersistenceManager {
    /// Starts the worker task that owns `store`.
    ///
    /// The worker stops once every sender has been dropped.
    pub fn spawn(store: SettingsStore) -> Self {
        let (tx, mut rx) = channel::<SettingsAction>(32);
        let handle = tokio::spawn(async move {
            info!("Persistence worker started ({})", store.path().display());
            while let Some(action) = rx.recv().await {
                match action {
                    SettingsAction::StoreSpeed { speed } => {
                        let settings = FanSettings { last_speed: speed };
                        match store.save(&settings).await {
                            Ok(()) => debug!("Stored last speed {}", speed),
                            Err(e) => error!("Failed to store last speed: {}", e),
                        }
                    }
                    SettingsAction::Clear { response_tx } => {
                        handle_action!(store.clear(), response_tx);
                    }
                }
            }
            info!("Persistence worker stopped");
        });

        Self {
            tx,
            worker_handle: handle,
        }
    }

    pub fn get_sender(&self) -> Sender<SettingsAction> {
        self.tx.clone()
    }

    /// Drops the manager's sender and waits for queued actions to finish
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!("Persistence worker panicked: {}", e);
        }
    }
}

#[derive(Debug)]
pub enum SettingsAction {
    StoreSpeed {
        speed: FanSpeed,
    },
    Clear {
        response_tx: oneshot::Sender<Result<()>>,
    },
}
