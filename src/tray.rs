//! System tray icon for the main window
//!
//! The icon only exists once the main view has loaded. Its callback message is
//! [`WM_APP_TRAY`]; the window procedure turns it into a [`TrayEvent`].

use log::{debug, info, warn};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, POINT};
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreatePopupMenu, DestroyMenu, GetCursorPos, InsertMenuW, LoadIconW, SetForegroundWindow,
    TrackPopupMenu, HICON, IDI_APPLICATION, MF_SEPARATOR, MF_STRING, TPM_RETURNCMD,
    TPM_RIGHTBUTTON, WM_LBUTTONUP, WM_RBUTTONUP,
};

use crate::error::{ShellError, ShellResult};
use crate::utils::to_wide_string;
use crate::window::proc::WM_APP_TRAY;

/// Tray icon identifier
const TRAY_ICON_ID: u32 = 1;
const TRAY_TOOLTIP: &str = "Lodestar";

/// What happened on the tray icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    LeftClick,
    RightClick,
    Other,
}

impl TrayEvent {
    /// Decode the mouse message carried in the callback's `lParam`
    pub fn from_lparam(lparam: LPARAM) -> Self {
        match (lparam.0 & 0xFFFF) as u32 {
            WM_LBUTTONUP => TrayEvent::LeftClick,
            WM_RBUTTONUP => TrayEvent::RightClick,
            _ => TrayEvent::Other,
        }
    }
}

/// Notification-area icon owned by the main window
pub struct TrayIcon {
    hwnd: HWND,
    icon: HICON,
    is_added: bool,
}

impl TrayIcon {
    pub fn new(hwnd: HWND) -> ShellResult<Self> {
        // Shared system icon; never destroyed
        let icon = unsafe { LoadIconW(None, IDI_APPLICATION)? };

        let mut tray = Self {
            hwnd,
            icon,
            is_added: false,
        };
        tray.add()?;
        Ok(tray)
    }

    fn add(&mut self) -> ShellResult<()> {
        let tooltip = to_wide_string(TRAY_TOOLTIP);

        let mut nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.hwnd,
            uID: TRAY_ICON_ID,
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
            uCallbackMessage: WM_APP_TRAY,
            hIcon: self.icon,
            ..Default::default()
        };

        let tooltip_len = tooltip.len().min(nid.szTip.len());
        nid.szTip[..tooltip_len].copy_from_slice(&tooltip[..tooltip_len]);

        unsafe {
            if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
                return Err(ShellError::TrayIcon("Failed to add tray icon".to_string()));
            }
        }

        self.is_added = true;
        info!("Tray icon added");
        Ok(())
    }

    fn remove(&mut self) -> ShellResult<()> {
        if !self.is_added {
            return Ok(());
        }

        let nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.hwnd,
            uID: TRAY_ICON_ID,
            ..Default::default()
        };

        unsafe {
            if !Shell_NotifyIconW(NIM_DELETE, &nid).as_bool() {
                return Err(ShellError::TrayIcon(
                    "Failed to remove tray icon".to_string(),
                ));
            }
        }

        self.is_added = false;
        info!("Tray icon removed");
        Ok(())
    }
}

impl Drop for TrayIcon {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!("{}", e);
        }
    }
}

/// Commands offered by the tray context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    Show,
    Exit,
}

impl TrayCommand {
    fn id(self) -> u32 {
        match self {
            TrayCommand::Show => 1,
            TrayCommand::Exit => 100,
        }
    }

    fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(TrayCommand::Show),
            100 => Some(TrayCommand::Exit),
            _ => None,
        }
    }
}

/// Tray context menu
pub struct TrayMenu {
    items: Vec<Option<(TrayCommand, &'static str)>>,
}

impl TrayMenu {
    pub fn new() -> Self {
        Self {
            items: vec![
                Some((TrayCommand::Show, "Show Lodestar")),
                None,
                Some((TrayCommand::Exit, "Exit")),
            ],
        }
    }

    /// Show the menu at the cursor and wait for a choice
    pub fn show(&self, hwnd: HWND) -> Option<TrayCommand> {
        unsafe {
            let menu = CreatePopupMenu().ok()?;

            for item in &self.items {
                match item {
                    None => {
                        InsertMenuW(menu, u32::MAX, MF_SEPARATOR, 0, PCWSTR::null()).ok()?;
                    }
                    Some((command, label)) => {
                        let label = to_wide_string(label);
                        InsertMenuW(
                            menu,
                            u32::MAX,
                            MF_STRING,
                            command.id() as usize,
                            PCWSTR::from_raw(label.as_ptr()),
                        )
                        .ok()?;
                    }
                }
            }

            let mut pt = POINT::default();
            GetCursorPos(&mut pt).ok()?;

            // Required for the menu to close when it loses focus
            let _ = SetForegroundWindow(hwnd);

            let cmd = TrackPopupMenu(
                menu,
                TPM_RIGHTBUTTON | TPM_RETURNCMD,
                pt.x,
                pt.y,
                0,
                hwnd,
                None,
            );

            let _ = DestroyMenu(menu);

            let command = TrayCommand::from_id(cmd.0 as u32);
            debug!("Tray menu returned {:?}", command);
            command
        }
    }
}

impl Default for TrayMenu {
    fn default() -> Self {
        Self::new()
    }
}
