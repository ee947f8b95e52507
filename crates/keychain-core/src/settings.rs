//! Keychain settings
//!
//! Non-sensitive configuration stored in a plain JSON file: which platform
//! store to use and the accessibility applied when a write omits one.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::accessibility::Accessibility;
use crate::store::DEFAULT_INDEX_ACCOUNT;

/// Settings file name inside the config directory
const SETTINGS_FILE: &str = "keychain.json";

/// Settings load/save errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Platform store backing the keychain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// OS keychain
    #[default]
    Keyring,
    /// Process-local store; nothing survives a restart
    Memory,
}

/// Keychain settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Platform store to use
    pub backend: Backend,
    /// Accessibility applied when a write omits one
    pub default_accessibility: Accessibility,
    /// Reserved account holding each service's account index (keyring only)
    pub keyring_index_account: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            backend: Backend::default(),
            default_accessibility: Accessibility::default(),
            keyring_index_account: DEFAULT_INDEX_ACCOUNT.to_string(),
        }
    }
}

impl Settings {
    /// Default settings file location for the current user
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        ProjectDirs::from("dev", "keychain-core", "keychain-core")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Load settings, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!("No settings file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        // Write atomically using temp file
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &contents)?;
        std::fs::rename(&temp_path, path)?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }
}
