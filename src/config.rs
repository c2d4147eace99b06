//! Configuration management for Lodestar
//!
//! Handles loading, saving, and managing user preferences for the main window.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ShellResult;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General application settings
    pub general: GeneralConfig,
    /// Hotkey configurations
    pub hotkeys: HotkeyConfig,
    /// Database backup settings
    pub backup: BackupConfig,
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lodestar")
            .join("config.toml")
    }

    /// Load configuration from file or create default
    pub fn load_or_default() -> ShellResult<Self> {
        Self::load_or_default_from(&Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if it is missing
    pub fn load_or_default_from(path: &Path) -> ShellResult<Self> {
        if path.exists() {
            info!("Loading configuration from: {:?}", path);
            let content = std::fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to parse config, using defaults: {}", e);
                    let kept = Self::broken_path(path);
                    if let Err(e) = std::fs::rename(path, &kept) {
                        // Leave the user's file alone rather than overwrite it
                        warn!("Could not move unreadable config to {:?}: {}", kept, e);
                        return Ok(Self::default());
                    }
                    info!("Unreadable config kept at {:?}", kept);
                }
            }
        }

        let config = Self::default();
        config.save_to(path)?;
        Ok(config)
    }

    /// Where an unparsable config file is moved before defaults replace it
    pub fn broken_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".bak");
        path.with_file_name(name)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> ShellResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to: {:?}", path);
        Ok(())
    }

    /// Configured user data folder, ignoring blank values
    pub fn user_data_folder(&self) -> Option<&Path> {
        self.general
            .user_data_folder
            .as_deref()
            .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Folder holding the launcher database; unset until the welcome page completes
    pub user_data_folder: Option<PathBuf>,
    /// What the close button does
    pub close_window_option: CloseOption,
    /// What happens to the main window when a game starts
    pub start_game_action: StartGameAction,
}

/// Close button behaviour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CloseOption {
    /// Hide to the notification area
    Hide,
    /// Quit the process
    Exit,
    /// Ask with a dialog every time
    #[default]
    #[serde(other)]
    AskEachTime,
}

/// Main window behaviour once a game has been launched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StartGameAction {
    #[default]
    Hide,
    Minimize,
    #[serde(other)]
    DoNothing,
}

/// Hotkey configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Open the in-game overlay (or the main window if no game is running)
    pub overlay: Option<String>,
    /// Take a screenshot of the running game
    pub screenshot: Option<String>,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            overlay: Some("Alt+Q".to_string()),
            screenshot: Some("Alt+Shift+S".to_string()),
        }
    }
}

/// Backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Back up the database when the app exits
    pub on_exit: bool,
    /// Longest time the exit sequence waits for the backup, in seconds
    pub timeout_secs: u64,
    /// Number of backup files to retain
    pub keep: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            on_exit: true,
            timeout_secs: 30,
            keep: 10,
        }
    }
}
