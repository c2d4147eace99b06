//! Close-option task dialog

use log::debug;
use windows::core::w;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Controls::{
    TaskDialogIndirect, TASKDIALOGCONFIG, TASKDIALOG_BUTTON, TDCBF_CANCEL_BUTTON,
    TDCBF_OK_BUTTON, TDF_POSITION_RELATIVE_TO_WINDOW,
};
use windows::Win32::UI::WindowsAndMessaging::IDOK;

use crate::config::CloseOption;
use crate::error::{ShellError, ShellResult};
use crate::shell::close::PromptAnswer;

const RADIO_HIDE: i32 = 101;
const RADIO_EXIT: i32 = 102;

/// Ask whether closing the window should hide it or exit
pub fn ask_close_option(owner: HWND) -> ShellResult<PromptAnswer> {
    let radios = [
        TASKDIALOG_BUTTON {
            nButtonID: RADIO_HIDE,
            pszButtonText: w!("Minimize to system tray"),
        },
        TASKDIALOG_BUTTON {
            nButtonID: RADIO_EXIT,
            pszButtonText: w!("Exit Lodestar"),
        },
    ];

    let config = TASKDIALOGCONFIG {
        cbSize: std::mem::size_of::<TASKDIALOGCONFIG>() as u32,
        hwndParent: owner,
        dwFlags: TDF_POSITION_RELATIVE_TO_WINDOW,
        dwCommonButtons: TDCBF_OK_BUTTON | TDCBF_CANCEL_BUTTON,
        pszWindowTitle: w!("Lodestar"),
        pszMainInstruction: w!("What should closing the window do?"),
        pszContent: w!("Your choice is remembered and can be changed in the settings."),
        cRadioButtons: radios.len() as u32,
        pRadioButtons: radios.as_ptr(),
        nDefaultRadioButton: RADIO_HIDE,
        ..Default::default()
    };

    let mut button = 0i32;
    let mut radio = 0i32;
    unsafe {
        TaskDialogIndirect(
            &config,
            Some(&mut button as *mut i32),
            Some(&mut radio as *mut i32),
            None,
        )
        .map_err(|e| ShellError::Dialog(e.to_string()))?;
    }
    debug!("Close dialog returned button {} radio {}", button, radio);

    Ok(interpret(button, radio))
}

fn interpret(button: i32, radio: i32) -> PromptAnswer {
    if button != IDOK.0 {
        return PromptAnswer::Cancelled;
    }
    match radio {
        RADIO_EXIT => PromptAnswer::Confirmed(CloseOption::Exit),
        _ => PromptAnswer::Confirmed(CloseOption::Hide),
    }
}
