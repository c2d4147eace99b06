//! Application startup and shutdown for the Windows build

use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::PostMessageW;

use crate::events::EventBus;
use crate::hotkey::HotkeyManager;
use crate::services::DesktopServices;
use crate::shell::{Shell, SharedConfig};
use crate::utils::{DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};
use crate::window::{state, Win32Window, WM_APP_WAKE};

/// Main application state
pub struct Application {
    settings: SharedConfig,
    bus: Arc<EventBus>,
}

impl Application {
    pub fn new(settings: SharedConfig) -> Self {
        Self {
            settings,
            bus: Arc::new(EventBus::new()),
        }
    }

    /// Create the main window and run until it quits
    pub fn run(&mut self) -> Result<()> {
        info!("Initializing Lodestar main window");

        let window = Win32Window::create()?;
        let hwnd = window.hwnd();

        let mut hotkeys = HotkeyManager::new(hwnd);
        hotkeys.register_from_config(&self.settings.config.read().hotkeys);
        let services = DesktopServices::new(hotkeys);

        // HWND is not Send; carry the raw handle into the bus callback
        let raw_hwnd = hwnd.0 as isize;
        let wake = move || unsafe {
            let hwnd = HWND(raw_hwnd as *mut core::ffi::c_void);
            if let Err(e) = PostMessageW(hwnd, WM_APP_WAKE, WPARAM(0), LPARAM(0)) {
                warn!("Failed to wake main window: {}", e);
            }
        };

        let mut shell = Shell::new(
            window,
            services,
            self.settings.clone(),
            self.bus.clone(),
            wake,
        );
        shell.center_in_screen(Some(DEFAULT_WINDOW_WIDTH), Some(DEFAULT_WINDOW_HEIGHT));
        shell.show();
        state::install(shell);

        // Replay anything that arrived before the shell was installed
        unsafe {
            let _ = PostMessageW(hwnd, WM_APP_WAKE, WPARAM(0), LPARAM(0));
        }

        Win32Window::run_message_loop()?;

        if let Some(mut shell) = state::take() {
            shell.teardown();
        }
        info!("Main window closed");
        Ok(())
    }
}
