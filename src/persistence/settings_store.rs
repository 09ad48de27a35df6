use super::FanSettings;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "iofan";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store keeping its file inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SETTINGS_FILE),
        }
    }

    /// Store under the user's configuration directory
    pub fn default_location() -> Self {
        Self::in_dir(default_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads persisted settings, falling back to defaults when there are none
    pub async fn load(&self) -> Result<FanSettings> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            warn!(
                "Settings file {} does not exist, using defaults",
                self.path.display()
            );
            return Ok(FanSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| eyre!("Failed to read settings file: {}", e))?;

        let settings: FanSettings = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse settings file: {}", e))?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Like [`load`](Self::load), but unreadable files also yield defaults
    pub async fn load_or_default(&self) -> FanSettings {
        match self.load().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Could not load settings, using defaults: {}", e);
                FanSettings::default()
            }
        }
    }

    pub async fn save(&self, settings: &FanSettings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
        }

        let content = toml::to_string_pretty(settings)
            .map_err(|e| eyre!("Failed to serialize settings: {}", e))?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| eyre!("Failed to write settings file: {}", e))?;

        debug!("Settings saved to {}", self.path.display());
        Ok(())
    }

    /// Removes all persisted settings. Clearing an empty store succeeds.
    pub async fn clear(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            tokio::fs::remove_file(&self.path)
                .await
                .map_err(|e| eyre!("Failed to delete settings file: {}", e))?;
            info!("Settings cleared ({})", self.path.display());
        } else {
            debug!("No settings to clear");
        }
        Ok(())
    }
}

pub fn default_dir() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| {
        warn!("Could not determine config directory, using current directory");
        PathBuf::from(".")
    });
    dir.push(APP_DIR);
    dir
}
