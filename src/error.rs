//! Custom error types for the Lodestar shell

use thiserror::Error;

/// Main error type for shell operations
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApi(#[from] windows::core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Tray icon error: {0}")]
    TrayIcon(String),

    #[error("Hotkey error: {0}")]
    Hotkey(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Dialog error: {0}")]
    Dialog(String),
}

impl From<toml::ser::Error> for ShellError {
    fn from(e: toml::ser::Error) -> Self {
        ShellError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for ShellError {
    fn from(e: serde_json::Error) -> Self {
        ShellError::Serialization(e.to_string())
    }
}

/// Result type alias for shell operations
pub type ShellResult<T> = Result<T, ShellError>;
