//! # Persistence Module
//!
//! Keeps the last selected fan speed across restarts. The controller never touches
//! the filesystem itself: it sends [`SettingsAction`]s to a worker task that owns
//! the [`SettingsStore`].
//!
//! ## Error Handling Strategy
//! File plumbing uses `color_eyre` for error context. A missing or unreadable
//! settings file degrades to defaults (fan off) instead of preventing startup.

pub mod persistence_worker;
pub mod settings_store;

pub use persistence_worker::{PersistenceManager, SettingsAction};
pub use settings_store::SettingsStore;

use crate::fan::FanSpeed;
use serde::{Deserialize, Serialize};

/// Settings that survive a restart
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FanSettings {
    /// Speed restored at startup
    pub last_speed: FanSpeed,
}
