//! Hotkey system for Lodestar
//!
//! Parses hotkey strings and owns the global hotkeys registered on the main window.

/// Win32 hotkey modifier flags
pub const MOD_ALT: u32 = 0x0001;
pub const MOD_CONTROL: u32 = 0x0002;
pub const MOD_SHIFT: u32 = 0x0004;
pub const MOD_WIN: u32 = 0x0008;

/// Fixed hotkey ids shared with the rest of the launcher
pub const HK_TOGGLE_OVERLAY: i32 = 44444;
pub const HK_SCREENSHOT: i32 = 44445;

/// Hotkey action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    ToggleOverlay,
    Screenshot,
}

impl HotkeyAction {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            HK_TOGGLE_OVERLAY => Some(HotkeyAction::ToggleOverlay),
            HK_SCREENSHOT => Some(HotkeyAction::Screenshot),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            HotkeyAction::ToggleOverlay => HK_TOGGLE_OVERLAY,
            HotkeyAction::Screenshot => HK_SCREENSHOT,
        }
    }
}

/// Parsed hotkey
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub modifiers: u32,
    pub key: u32,
    pub action: HotkeyAction,
}

impl Hotkey {
    /// Parse a hotkey string like "Alt+Q" or "Ctrl+Shift+S"
    pub fn parse(s: &str, action: HotkeyAction) -> Option<Self> {
        let parts: Vec<&str> = s.split('+').map(|p| p.trim()).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }

        let mut modifiers = 0u32;
        let mut key = 0u32;

        for (i, part) in parts.iter().enumerate() {
            let part_upper = part.to_uppercase();

            if i == parts.len() - 1 {
                key = Self::parse_key(&part_upper)?;
            } else {
                match part_upper.as_str() {
                    "ALT" => modifiers |= MOD_ALT,
                    "CTRL" | "CONTROL" => modifiers |= MOD_CONTROL,
                    "SHIFT" => modifiers |= MOD_SHIFT,
                    "WIN" | "WINDOWS" | "SUPER" => modifiers |= MOD_WIN,
                    _ => return None,
                }
            }
        }

        Some(Self {
            modifiers,
            key,
            action,
        })
    }

    /// Parse a key name to virtual key code
    fn parse_key(s: &str) -> Option<u32> {
        if s.len() == 1 {
            let c = s.chars().next()?;
            if c.is_ascii_alphanumeric() {
                return Some(c.to_ascii_uppercase() as u32);
            }
        }

        match s {
            "SPACE" => Some(0x20),
            "TAB" => Some(0x09),
            "HOME" => Some(0x24),
            "END" => Some(0x23),
            "INSERT" | "INS" => Some(0x2D),
            "PRINTSCREEN" | "PRTSC" => Some(0x2C),
            "F1" => Some(0x70),
            "F2" => Some(0x71),
            "F3" => Some(0x72),
            "F4" => Some(0x73),
            "F5" => Some(0x74),
            "F6" => Some(0x75),
            "F7" => Some(0x76),
            "F8" => Some(0x77),
            "F9" => Some(0x78),
            "F10" => Some(0x79),
            "F11" => Some(0x7A),
            "F12" => Some(0x7B),
            _ => None,
        }
    }
}

#[cfg(windows)]
pub use self::win32::HotkeyManager;

#[cfg(windows)]
mod win32 {
    use log::{debug, info, warn};
    use std::collections::HashMap;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_NOREPEAT,
    };

    use super::{Hotkey, HotkeyAction};
    use crate::config::HotkeyConfig;
    use crate::error::{ShellError, ShellResult};

    /// Global hotkeys owned by the main window
    pub struct HotkeyManager {
        hwnd: HWND,
        hotkeys: HashMap<i32, Hotkey>,
    }

    impl HotkeyManager {
        pub fn new(hwnd: HWND) -> Self {
            Self {
                hwnd,
                hotkeys: HashMap::new(),
            }
        }

        /// Register every configured hotkey, logging the ones that fail
        pub fn register_from_config(&mut self, config: &HotkeyConfig) {
            let wanted = [
                (config.overlay.as_deref(), HotkeyAction::ToggleOverlay),
                (config.screenshot.as_deref(), HotkeyAction::Screenshot),
            ];
            for (key, action) in wanted {
                let Some(key) = key else { continue };
                if let Err(e) = self.register_from_string(key, action) {
                    warn!("Failed to register {:?} hotkey '{}': {}", action, key, e);
                }
            }
        }

        pub fn register_from_string(&mut self, s: &str, action: HotkeyAction) -> ShellResult<i32> {
            let hotkey = Hotkey::parse(s, action)
                .ok_or_else(|| ShellError::Hotkey(format!("Invalid hotkey string: {}", s)))?;
            self.register(hotkey)
        }

        /// Register a hotkey under its action's fixed id
        pub fn register(&mut self, hotkey: Hotkey) -> ShellResult<i32> {
            let id = hotkey.action.id();
            unsafe {
                RegisterHotKey(
                    self.hwnd,
                    id,
                    HOT_KEY_MODIFIERS(hotkey.modifiers) | MOD_NOREPEAT,
                    hotkey.key,
                )?;
            }
            info!(
                "Registered hotkey id={} modifiers={} key=0x{:X} for {:?}",
                id, hotkey.modifiers, hotkey.key, hotkey.action
            );
            self.hotkeys.insert(id, hotkey);
            Ok(id)
        }

        /// Unregister all hotkeys
        pub fn unregister_all(&mut self) {
            for id in self.hotkeys.keys().copied().collect::<Vec<_>>() {
                unsafe {
                    if UnregisterHotKey(self.hwnd, id).is_ok() {
                        debug!("Unregistered hotkey {}", id);
                    }
                }
                self.hotkeys.remove(&id);
            }
        }
    }

    impl Drop for HotkeyManager {
        fn drop(&mut self) {
            self.unregister_all();
        }
    }
}
