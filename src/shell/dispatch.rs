//! Translation of raw window messages into typed platform events
//!
//! Message parameters are decoded exactly once, here. The window procedure
//! only has to read the device header for `WM_DEVICECHANGE`.

use crate::hotkey::HotkeyAction;
use crate::utils::loword;

pub const WM_ACTIVATE: u32 = 0x0006;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_SETTINGCHANGE: u32 = 0x001A;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_SYSCOMMAND: u32 = 0x0112;
pub const WM_DEVICECHANGE: u32 = 0x0219;
pub const WM_POINTERACTIVATE: u32 = 0x024B;
pub const WM_WTSSESSION_CHANGE: u32 = 0x02B1;
pub const WM_HOTKEY: u32 = 0x0312;
pub const WM_DWMCOLORIZATIONCOLORCHANGED: u32 = 0x0320;

const WA_ACTIVE: u32 = 1;
const WA_CLICKACTIVE: u32 = 2;
const SC_MAXIMIZE: usize = 0xF030;
const WTS_SESSION_LOCK: usize = 0x7;
const WTS_SESSION_UNLOCK: usize = 0x8;
pub const DBT_DEVICEARRIVAL: usize = 0x8000;
pub const DBT_DEVICEREMOVECOMPLETE: usize = 0x8004;
pub const DBT_DEVTYP_VOLUME: u32 = 0x0002;
const VK_ESCAPE: usize = 0x1B;

/// A window message with its parameters already read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub msg: u32,
    pub wparam: usize,
    /// `dbch_devicetype` of the broadcast header for device changes
    pub device_type: Option<u32>,
    /// String carried by `WM_SETTINGCHANGE`
    pub setting: Option<String>,
}

impl RawMessage {
    pub fn new(msg: u32, wparam: usize) -> Self {
        Self {
            msg,
            wparam,
            ..Default::default()
        }
    }

    /// Whether the window procedure must read the device broadcast header
    pub fn wants_device_header(msg: u32, wparam: usize) -> bool {
        msg == WM_DEVICECHANGE
            && (wparam == DBT_DEVICEARRIVAL || wparam == DBT_DEVICEREMOVECOMPLETE)
    }
}

/// Platform events the shell reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    Activated,
    MaximizeRequested,
    SessionLocked,
    SessionUnlocked,
    StorageVolumeChanged,
    Hotkey(HotkeyAction),
    CloseRequested,
    EscapePressed,
    ColorSettingChanged,
    Unhandled,
}

impl PlatformEvent {
    pub fn translate(raw: &RawMessage) -> Self {
        match raw.msg {
            WM_ACTIVATE | WM_POINTERACTIVATE => match loword(raw.wparam) {
                WA_ACTIVE | WA_CLICKACTIVE => PlatformEvent::Activated,
                _ => PlatformEvent::Unhandled,
            },
            // Low four bits of SC_* are used internally by the system
            WM_SYSCOMMAND if raw.wparam & 0xFFF0 == SC_MAXIMIZE => {
                PlatformEvent::MaximizeRequested
            }
            WM_WTSSESSION_CHANGE => match raw.wparam {
                WTS_SESSION_LOCK => PlatformEvent::SessionLocked,
                WTS_SESSION_UNLOCK => PlatformEvent::SessionUnlocked,
                _ => PlatformEvent::Unhandled,
            },
            WM_DEVICECHANGE
                if RawMessage::wants_device_header(raw.msg, raw.wparam)
                    && raw.device_type == Some(DBT_DEVTYP_VOLUME) =>
            {
                PlatformEvent::StorageVolumeChanged
            }
            WM_HOTKEY => HotkeyAction::from_id(raw.wparam as i32)
                .map(PlatformEvent::Hotkey)
                .unwrap_or(PlatformEvent::Unhandled),
            WM_CLOSE => PlatformEvent::CloseRequested,
            WM_KEYDOWN if raw.wparam == VK_ESCAPE => PlatformEvent::EscapePressed,
            WM_SETTINGCHANGE if raw.setting.as_deref() == Some("ImmersiveColorSet") => {
                PlatformEvent::ColorSettingChanged
            }
            WM_DWMCOLORIZATIONCOLORCHANGED => PlatformEvent::ColorSettingChanged,
            _ => PlatformEvent::Unhandled,
        }
    }
}

/// What the window procedure does after the shell has seen a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Pass the message on to `DefWindowProcW`
    Default,
    /// Return 0 without default processing
    Swallow,
}
