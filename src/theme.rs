//! Theme handling for the main window
//!
//! The window follows the system light/dark setting. An accent colour change
//! forces a re-evaluation by requesting the opposite theme and immediately
//! going back to the system default.

/// Theme requested for the window content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestedTheme {
    Light,
    Dark,
    #[default]
    Default,
}

impl RequestedTheme {
    /// Resolve to a concrete dark flag given the system setting
    pub fn is_dark(self, system_is_dark: bool) -> bool {
        match self {
            RequestedTheme::Light => false,
            RequestedTheme::Dark => true,
            RequestedTheme::Default => system_is_dark,
        }
    }
}

/// Requests that force the theme to be evaluated again without changing it
pub fn reevaluation_sequence(actual_is_dark: bool) -> [RequestedTheme; 2] {
    let flipped = if actual_is_dark {
        RequestedTheme::Light
    } else {
        RequestedTheme::Dark
    };
    [flipped, RequestedTheme::Default]
}

/// Detect if Windows is using dark mode for apps
#[cfg(windows)]
pub fn detect_system_dark_mode() -> bool {
    use windows::core::PCWSTR;
    use windows::Win32::System::Registry::{
        RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_CURRENT_USER, KEY_READ,
    };

    unsafe {
        let mut key = HKEY::default();
        let subkey: Vec<u16> =
            "Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize\0"
                .encode_utf16()
                .collect();

        let result = RegOpenKeyExW(
            HKEY_CURRENT_USER,
            PCWSTR::from_raw(subkey.as_ptr()),
            0,
            KEY_READ,
            &mut key,
        );

        if result.is_err() {
            return false;
        }

        let value_name: Vec<u16> = "AppsUseLightTheme\0".encode_utf16().collect();
        let mut data: u32 = 1;
        let mut data_size: u32 = std::mem::size_of::<u32>() as u32;

        let result = RegQueryValueExW(
            key,
            PCWSTR::from_raw(value_name.as_ptr()),
            None,
            None,
            Some(&mut data as *mut u32 as *mut u8),
            Some(&mut data_size),
        );

        let _ = RegCloseKey(key);

        // 0 means dark mode, 1 means light mode
        result.is_ok() && data == 0
    }
}

#[cfg(not(windows))]
pub fn detect_system_dark_mode() -> bool {
    false
}
