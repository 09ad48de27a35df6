//! Application configuration
//!
//! Read once at startup from a TOML file. Every section and field has a default,
//! so a partial file (or none at all) yields a working setup.

use crate::button::GestureSettings;
use crate::fan::RelayPins;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "IOFAN_CONFIG";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Name reported in status snapshots
    pub device_name: String,

    /// Directory for persisted settings; the user config dir when unset
    pub settings_dir: Option<PathBuf>,

    pub buttons: ButtonPins,
    pub relays: RelayPins,
    pub gestures: GestureSettings,
    pub controller: ControllerSettings,
}

/// BCM pin numbers of the four push buttons
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonPins {
    pub power: u8,
    pub speed1: u8,
    pub speed2: u8,
    pub speed3: u8,
}

impl Default for ButtonPins {
    fn default() -> Self {
        Self {
            power: 17,
            speed1: 27,
            speed2: 22,
            speed3: 23,
        }
    }
}

/// Timing of the controller loop
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ControllerSettings {
    /// Sleep between two poll iterations. Must stay well below the
    /// double-click window or single clicks are recognised late.
    pub poll_interval_ms: u64,

    /// Buttons are ignored for this long after a speed change
    pub action_lockout_ms: u32,

    /// Period of status broadcasts
    pub status_interval_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2,
            action_lockout_ms: 200,
            status_interval_ms: 3000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads the config at `path`, writing a default file first if none exists
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Creating default configuration at {}", path.display());
            Self::default().save(path)?;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    pub fn device_name(&self) -> &str {
        if self.device_name.is_empty() {
            "iofan"
        } else {
            &self.device_name
        }
    }
}

/// Config path from `IOFAN_CONFIG`, else `<config dir>/iofan/config.toml`
pub fn config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None => crate::persistence::settings_store::default_dir().join(CONFIG_FILE),
    }
}
