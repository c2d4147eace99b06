//! Shell state reachable from the window procedure
//!
//! The shell lives in a thread-local [`ShellSlot`] on the UI thread. Messages
//! that arrive while it is borrowed (nested loops of modal dialogs, messages
//! sent synchronously by our own Win32 calls) are queued there and replayed
//! as soon as the borrow ends.

use std::cell::Cell;

use crate::services::DesktopServices;
use crate::shell::content::ContentView;
use crate::shell::dispatch::RawMessage;
use crate::shell::slot::ShellSlot;
use crate::shell::Shell;

use super::manager::Win32Window;

/// Shell type used by the Windows build
pub type DesktopShell = Shell<Win32Window, DesktopServices>;

thread_local! {
    static SLOT: ShellSlot<DesktopShell> = const { ShellSlot::new() };
    static CURRENT_VIEW: Cell<ContentView> = const { Cell::new(ContentView::Welcome) };
}

/// Install the shell for this thread
pub fn install(shell: DesktopShell) {
    SLOT.with(|slot| slot.install(shell));
}

/// Remove the shell, typically after the message loop ended
pub fn take() -> Option<DesktopShell> {
    SLOT.with(|slot| slot.take())
}

/// Run `f` with the shell; `None` if it is not installed or already in use
pub fn with_shell<R>(f: impl FnOnce(&mut DesktopShell) -> R) -> Option<R> {
    SLOT.with(|slot| slot.with(f))
}

/// Queue a message for the current borrower of the shell; returns the queue length
pub fn defer(raw: RawMessage) -> usize {
    SLOT.with(|slot| {
        slot.defer(raw);
        slot.pending()
    })
}

pub fn set_current_view(view: ContentView) {
    CURRENT_VIEW.with(|v| v.set(view));
}

pub fn current_view() -> ContentView {
    CURRENT_VIEW.with(|v| v.get())
}
