//! Window procedure for the main window
//!
//! Painting, hit testing and the tray callback are handled here directly.
//! Everything else is read into a [`RawMessage`] and handed to the shell.

use log::{debug, warn};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, DrawTextW, EndPaint, FillRect, GetStockObject, GetSysColorBrush, ScreenToClient,
    SetBkMode, SetTextColor, BLACK_BRUSH, COLOR_WINDOW, DT_CENTER, DT_SINGLELINE, DT_VCENTER,
    HBRUSH, PAINTSTRUCT, TRANSPARENT,
};
use windows::Win32::System::RemoteDesktop::WTSUnRegisterSessionNotification;
use windows::Win32::UI::HiDpi::GetDpiForWindow;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::shell::content::ContentView;
use crate::shell::dispatch::{Disposition, PlatformEvent, RawMessage};
use crate::tray::{TrayCommand, TrayEvent, TrayMenu};
use crate::utils::{get_dpi_scale, in_drag_region, scale_by, TITLE_BAR_HEIGHT};

use super::state::{current_view, defer, with_shell};

/// Posted when the shell has queued notifications or deferred messages
pub const WM_APP_WAKE: u32 = WM_APP + 1;
/// Tray icon callback
pub const WM_APP_TRAY: u32 = WM_APP + 2;
/// Fires when the exit backup has run out of time
pub const EXIT_TIMER_ID: usize = 1;

/// Window procedure for handling Windows messages
pub unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_PAINT => {
            paint(hwnd);
            LRESULT(0)
        }

        WM_NCHITTEST => {
            let hit = DefWindowProcW(hwnd, msg, wparam, lparam);
            if hit.0 == HTCLIENT as isize && hit_drag_region(hwnd, lparam) {
                LRESULT(HTCAPTION as isize)
            } else {
                hit
            }
        }

        WM_DPICHANGED => {
            // lParam carries the suggested window rectangle for the new DPI
            let suggested = &*(lparam.0 as *const RECT);
            let _ = SetWindowPos(
                hwnd,
                HWND::default(),
                suggested.left,
                suggested.top,
                suggested.right - suggested.left,
                suggested.bottom - suggested.top,
                SWP_NOZORDER | SWP_NOACTIVATE,
            );
            LRESULT(0)
        }

        WM_DESTROY => {
            debug!("Main window destroyed");
            let _ = WTSUnRegisterSessionNotification(hwnd);
            PostQuitMessage(0);
            LRESULT(0)
        }

        WM_APP_WAKE => {
            // A busy shell drains its queue itself when the borrow ends
            let pumped = with_shell(|shell| {
                shell.pump_notifications();
                shell.poll_exit();
            });
            if pumped.is_none() {
                debug!("Shell busy, wake left to the current borrower");
            }
            LRESULT(0)
        }

        WM_TIMER if wparam.0 == EXIT_TIMER_ID => {
            let _ = KillTimer(hwnd, EXIT_TIMER_ID);
            if with_shell(|shell| shell.on_exit_timer()).is_none() {
                // Shell busy; try again shortly
                let _ = SetTimer(hwnd, EXIT_TIMER_ID, 100, None);
            }
            LRESULT(0)
        }

        WM_APP_TRAY => {
            on_tray(hwnd, TrayEvent::from_lparam(lparam));
            LRESULT(0)
        }

        _ => {
            let raw = read_message(msg, wparam, lparam);
            let event = PlatformEvent::translate(&raw);
            if event == PlatformEvent::Unhandled {
                return DefWindowProcW(hwnd, msg, wparam, lparam);
            }

            let handled = with_shell(|shell| {
                let disposition = shell.on_event(event);
                shell.pump_notifications();
                disposition
            });
            match handled {
                Some(Disposition::Swallow) => LRESULT(0),
                Some(Disposition::Default) => DefWindowProcW(hwnd, msg, wparam, lparam),
                None => match event {
                    // A close or maximize that arrives while the shell is busy is dropped
                    PlatformEvent::CloseRequested | PlatformEvent::MaximizeRequested => {
                        debug!("Shell busy, dropping {:?}", event);
                        LRESULT(0)
                    }
                    _ => {
                        let queued = defer(raw);
                        debug!("Shell busy, deferring {:?} ({} queued)", event, queued);
                        // Covers the shell not being installed yet
                        let _ = PostMessageW(hwnd, WM_APP_WAKE, WPARAM(0), LPARAM(0));
                        DefWindowProcW(hwnd, msg, wparam, lparam)
                    }
                },
            }
        }
    }
}

/// Copy out the parts of a message that point into caller-owned memory
unsafe fn read_message(msg: u32, wparam: WPARAM, lparam: LPARAM) -> RawMessage {
    let mut raw = RawMessage::new(msg, wparam.0);

    if RawMessage::wants_device_header(msg, wparam.0) && lparam.0 != 0 {
        let header = &*(lparam.0 as *const DEV_BROADCAST_HDR);
        raw.device_type = Some(header.dbch_devicetype.0);
    }

    if msg == WM_SETTINGCHANGE && lparam.0 != 0 {
        raw.setting = PCWSTR::from_raw(lparam.0 as *const u16).to_string().ok();
    }

    raw
}

fn window_scale(hwnd: HWND) -> f64 {
    let dpi = unsafe { GetDpiForWindow(hwnd) };
    if dpi == 0 {
        1.0
    } else {
        get_dpi_scale(dpi)
    }
}

unsafe fn hit_drag_region(hwnd: HWND, lparam: LPARAM) -> bool {
    let mut pt = POINT {
        x: (lparam.0 & 0xFFFF) as i16 as i32,
        y: ((lparam.0 >> 16) & 0xFFFF) as i16 as i32,
    };
    if !ScreenToClient(hwnd, &mut pt).as_bool() {
        return false;
    }
    in_drag_region(pt.y, window_scale(hwnd))
}

unsafe fn paint(hwnd: HWND) {
    let mut ps = PAINTSTRUCT::default();
    let hdc = BeginPaint(hwnd, &mut ps);

    let mut client = RECT::default();
    let _ = GetClientRect(hwnd, &mut client);
    let title_height = scale_by(TITLE_BAR_HEIGHT, window_scale(hwnd));

    // Black lets the extended DWM frame show through the title bar region
    let title = RECT {
        bottom: client.top + title_height,
        ..client
    };
    let body = RECT {
        top: title.bottom,
        ..client
    };
    FillRect(hdc, &title, HBRUSH(GetStockObject(BLACK_BRUSH).0));
    FillRect(hdc, &body, GetSysColorBrush(COLOR_WINDOW));

    let label = match current_view() {
        ContentView::Welcome => "Welcome to Lodestar",
        ContentView::Main => "Lodestar",
    };
    let mut text: Vec<u16> = label.encode_utf16().collect();
    let mut text_rect = body;
    SetBkMode(hdc, TRANSPARENT);
    SetTextColor(hdc, COLORREF(0x0040_4040));
    DrawTextW(
        hdc,
        &mut text,
        &mut text_rect,
        DT_CENTER | DT_VCENTER | DT_SINGLELINE,
    );

    let _ = EndPaint(hwnd, &ps);
}

fn on_tray(hwnd: HWND, event: TrayEvent) {
    match event {
        TrayEvent::LeftClick => {
            with_shell(|shell| shell.show());
        }
        TrayEvent::RightClick => {
            // The menu runs its own modal loop; keep the shell free while it is open
            let Some(command) = TrayMenu::new().show(hwnd) else {
                return;
            };
            let handled = with_shell(|shell| match command {
                TrayCommand::Show => shell.show(),
                TrayCommand::Exit => {
                    shell.exit();
                }
            });
            if handled.is_none() {
                warn!("Shell busy, tray command {:?} ignored", command);
            }
        }
        TrayEvent::Other => {}
    }
}
