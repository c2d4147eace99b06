//! Lodestar - main window shell of a desktop game launcher
//!
//! Hosts the welcome and main views, tracks window activation, routes global
//! hotkeys and decides what closing the window means.

#![cfg_attr(windows, windows_subsystem = "windows")]
#![cfg_attr(not(windows), allow(dead_code))]

#[cfg(windows)]
mod app;
mod backup;
mod config;
mod error;
mod events;
mod hotkey;
mod services;
mod shell;
mod theme;
#[cfg(windows)]
mod tray;
mod utils;
#[cfg(windows)]
mod window;

use anyhow::Result;
use log::{info, LevelFilter};

use crate::config::Config;

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .init();

    info!("Starting Lodestar v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default()?;
    info!("Configuration loaded from {}", Config::config_path().display());

    run(config)?;

    info!("Lodestar shutting down gracefully");
    Ok(())
}

#[cfg(windows)]
fn run(config: Config) -> Result<()> {
    let settings = shell::SharedConfig::new(config, Config::config_path());
    app::Application::new(settings).run()
}

#[cfg(not(windows))]
fn run(_config: Config) -> Result<()> {
    anyhow::bail!("Lodestar's main window requires Windows")
}
