//! Collaborators the shell calls directly
//!
//! The overlay, screen capture and gamepad integrations live outside the
//! window shell. The shell only needs these entry points.

use log::{debug, info};

/// Launcher services invoked from the main window
pub trait Services {
    /// Open the in-game overlay; false when no game window can host it
    fn open_overlay(&mut self) -> bool;
    /// Capture the running game
    fn capture_screen(&mut self);
    /// Give the gamepad guide button back to Game Bar
    fn restore_gamepad_guide_button(&mut self);
    /// Release the global hotkeys
    fn unregister_hotkeys(&mut self);
}

/// Services used when no overlay, capture or gamepad backend is attached
#[derive(Debug, Default)]
pub struct DetachedServices {
    pub hotkeys_released: bool,
}

impl Services for DetachedServices {
    fn open_overlay(&mut self) -> bool {
        debug!("No overlay backend attached");
        false
    }

    fn capture_screen(&mut self) {
        info!("Screen capture requested but no capture backend is attached");
    }

    fn restore_gamepad_guide_button(&mut self) {
        debug!("No gamepad backend attached");
    }

    fn unregister_hotkeys(&mut self) {
        self.hotkeys_released = true;
    }
}

/// Services for the Windows build: real hotkeys, detached everything else
#[cfg(windows)]
pub struct DesktopServices {
    hotkeys: crate::hotkey::HotkeyManager,
    detached: DetachedServices,
}

#[cfg(windows)]
impl DesktopServices {
    pub fn new(hotkeys: crate::hotkey::HotkeyManager) -> Self {
        Self {
            hotkeys,
            detached: DetachedServices::default(),
        }
    }
}

#[cfg(windows)]
impl Services for DesktopServices {
    fn open_overlay(&mut self) -> bool {
        self.detached.open_overlay()
    }

    fn capture_screen(&mut self) {
        self.detached.capture_screen()
    }

    fn restore_gamepad_guide_button(&mut self) {
        self.detached.restore_gamepad_guide_button()
    }

    fn unregister_hotkeys(&mut self) {
        self.hotkeys.unregister_all();
    }
}
