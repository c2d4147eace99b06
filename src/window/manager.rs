//! Win32 main window
//!
//! Handles window creation, title bar styling, geometry queries and the
//! [`WindowHost`] operations the shell drives.

use log::{debug, info, warn};
use std::time::Duration;
use windows::core::w;
use windows::Win32::Foundation::{HWND, POINT, RECT};
use windows::Win32::Graphics::Dwm::{
    DwmExtendFrameIntoClientArea, DwmSetWindowAttribute, DWMWA_USE_IMMERSIVE_DARK_MODE,
};
use windows::Win32::Graphics::Gdi::{
    GetMonitorInfoW, InvalidateRect, MonitorFromPoint, MonitorFromWindow, HMONITOR, MONITORINFO,
    MONITOR_DEFAULTTONEAREST, MONITOR_DEFAULTTOPRIMARY,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::RemoteDesktop::{WTSRegisterSessionNotification, NOTIFY_FOR_THIS_SESSION};
use windows::Win32::UI::Controls::MARGINS;
use windows::Win32::UI::HiDpi::{
    GetDpiForWindow, SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::error::{ShellError, ShellResult};
use crate::shell::close::PromptAnswer;
use crate::shell::content::ContentView;
use crate::shell::WindowHost;
use crate::theme::{detect_system_dark_mode, RequestedTheme};
use crate::tray::TrayIcon;
use crate::utils::{
    get_dpi_scale, scale_by, Point, Rect, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH,
    TITLE_BAR_HEIGHT,
};

use super::dialog::ask_close_option;
use super::proc::EXIT_TIMER_ID;
use super::state::set_current_view;

const WINDOW_CLASS: windows::core::PCWSTR = w!("LodestarMainWindow");
const WINDOW_TITLE: windows::core::PCWSTR = w!("Lodestar");

/// The launcher's main window
pub struct Win32Window {
    hwnd: HWND,
    tray: Option<TrayIcon>,
    requested_theme: RequestedTheme,
}

impl Win32Window {
    /// Register the class and create the (hidden) main window
    pub fn create() -> ShellResult<Self> {
        unsafe {
            let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
        }

        Self::register_window_class()?;
        let hwnd = Self::create_window()?;

        let window = Self {
            hwnd,
            tray: None,
            requested_theme: RequestedTheme::Default,
        };
        window.extend_title_bar();
        window.apply_theme();

        unsafe {
            if let Err(e) = WTSRegisterSessionNotification(hwnd, NOTIFY_FOR_THIS_SESSION) {
                warn!("Failed to register for session notifications: {}", e);
            }
        }

        info!("Main window created");
        Ok(window)
    }

    fn register_window_class() -> ShellResult<()> {
        unsafe {
            let hinstance = GetModuleHandleW(None)?;

            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(super::proc::window_proc),
                hInstance: hinstance.into(),
                hIcon: LoadIconW(None, IDI_APPLICATION)?,
                hCursor: LoadCursorW(None, IDC_ARROW)?,
                lpszClassName: WINDOW_CLASS,
                ..Default::default()
            };

            if RegisterClassExW(&wc) == 0 {
                return Err(ShellError::WindowCreation(
                    "Failed to register window class".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn create_window() -> ShellResult<HWND> {
        // Caption with icon and system menu; no maximize box, no sizing frame
        let style = WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX;

        unsafe {
            let hinstance = GetModuleHandleW(None)?;

            let hwnd = CreateWindowExW(
                WS_EX_APPWINDOW,
                WINDOW_CLASS,
                WINDOW_TITLE,
                style,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                DEFAULT_WINDOW_WIDTH,
                DEFAULT_WINDOW_HEIGHT,
                None,
                None,
                hinstance,
                None,
            )?;

            if hwnd.0.is_null() {
                return Err(ShellError::WindowCreation(
                    "CreateWindowExW returned a null handle".to_string(),
                ));
            }
            Ok(hwnd)
        }
    }

    /// Let the DWM frame reach into the client area by the tall title bar height
    fn extend_title_bar(&self) {
        let margins = MARGINS {
            cxLeftWidth: 0,
            cxRightWidth: 0,
            cyTopHeight: scale_by(TITLE_BAR_HEIGHT, self.scale()),
            cyBottomHeight: 0,
        };
        unsafe {
            if let Err(e) = DwmExtendFrameIntoClientArea(self.hwnd, &margins) {
                debug!("Could not extend frame into client area: {}", e);
            }
        }
    }

    fn apply_theme(&self) {
        let dark: i32 = self.actual_theme_is_dark().into();
        unsafe {
            let _ = DwmSetWindowAttribute(
                self.hwnd,
                DWMWA_USE_IMMERSIVE_DARK_MODE,
                &dark as *const _ as *const _,
                std::mem::size_of::<i32>() as u32,
            );
            let _ = InvalidateRect(self.hwnd, None, true);
        }
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    /// Pump messages until `WM_QUIT`
    pub fn run_message_loop() -> ShellResult<()> {
        let mut msg = MSG::default();
        unsafe {
            loop {
                let ret = GetMessageW(&mut msg, None, 0, 0);
                match ret.0 {
                    0 => break,
                    -1 => {
                        return Err(ShellError::WindowsApi(windows::core::Error::from_win32()));
                    }
                    _ => {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    }
                }
            }
        }
        debug!("Message loop ended");
        Ok(())
    }
}

fn to_rect(r: RECT) -> Rect {
    Rect::new(r.left, r.top, r.right - r.left, r.bottom - r.top)
}

/// Work area of `monitor`, if it can be queried and is not empty
fn monitor_work_area(monitor: HMONITOR) -> Option<Rect> {
    if monitor.is_invalid() {
        return None;
    }
    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
        return None;
    }
    Some(to_rect(info.rcWork)).filter(|r| !r.is_empty())
}

fn primary_work_area() -> Option<Rect> {
    let mut work = RECT::default();
    unsafe {
        SystemParametersInfoW(
            SPI_GETWORKAREA,
            0,
            Some(&mut work as *mut RECT as *mut core::ffi::c_void),
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
        )
    }
    .ok()?;
    Some(to_rect(work)).filter(|r| !r.is_empty())
}

impl WindowHost for Win32Window {
    fn scale(&self) -> f64 {
        let dpi = unsafe { GetDpiForWindow(self.hwnd) };
        if dpi == 0 {
            1.0
        } else {
            get_dpi_scale(dpi)
        }
    }

    fn outer_rect(&self) -> Rect {
        let mut rect = RECT::default();
        unsafe {
            let _ = GetWindowRect(self.hwnd, &mut rect);
        }
        to_rect(rect)
    }

    fn pointer_work_area(&self) -> Rect {
        let mut pt = POINT::default();
        let from_pointer = unsafe { GetCursorPos(&mut pt) }
            .ok()
            .and_then(|_| monitor_work_area(unsafe { MonitorFromPoint(pt, MONITOR_DEFAULTTONEAREST) }));

        from_pointer
            .or_else(|| {
                debug!("No monitor under the pointer, using the window's monitor");
                monitor_work_area(unsafe { MonitorFromWindow(self.hwnd, MONITOR_DEFAULTTOPRIMARY) })
            })
            .or_else(primary_work_area)
            .unwrap_or_default()
    }

    fn move_and_resize(&mut self, rect: Rect) -> ShellResult<()> {
        unsafe {
            SetWindowPos(
                self.hwnd,
                HWND::default(),
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                SWP_NOZORDER | SWP_NOACTIVATE,
            )?;
        }
        Ok(())
    }

    fn show(&mut self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOWNORMAL);
            let _ = SetForegroundWindow(self.hwnd);
        }
    }

    fn hide(&mut self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
    }

    fn minimize(&mut self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_MINIMIZE);
        }
    }

    fn set_cursor_pos(&mut self, point: Point) {
        unsafe {
            let _ = SetCursorPos(point.x, point.y);
        }
    }

    fn set_content(&mut self, view: ContentView) {
        set_current_view(view);
        unsafe {
            let _ = InvalidateRect(self.hwnd, None, true);
        }
    }

    fn actual_theme_is_dark(&self) -> bool {
        self.requested_theme.is_dark(detect_system_dark_mode())
    }

    fn request_theme(&mut self, theme: RequestedTheme) {
        self.requested_theme = theme;
        self.apply_theme();
    }

    fn ensure_tray(&mut self) -> ShellResult<()> {
        if self.tray.is_none() {
            self.tray = Some(TrayIcon::new(self.hwnd)?);
        }
        Ok(())
    }

    fn prompt_close_option(&mut self) -> ShellResult<PromptAnswer> {
        ask_close_option(self.hwnd)
    }

    fn close(&mut self) {
        self.hide();
        self.tray = None;
    }

    fn start_exit_timer(&mut self, timeout: Duration) {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        unsafe {
            if SetTimer(self.hwnd, EXIT_TIMER_ID, millis, None) == 0 {
                // Without a timer only the backup's own report ends the wait
                warn!("Failed to arm exit timer for {:?}", timeout);
            }
        }
    }

    fn quit(&mut self) {
        unsafe {
            if let Err(e) = DestroyWindow(self.hwnd) {
                warn!("DestroyWindow failed, posting quit directly: {}", e);
                PostQuitMessage(0);
            }
        }
    }
}
