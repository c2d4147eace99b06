//! Win32 side of the main window
//!
//! The native window, its window procedure, the close dialog and the
//! thread-local slot that connects the procedure to the shell.

pub mod dialog;
pub mod manager;
pub mod proc;
pub mod state;

pub use manager::Win32Window;
pub use proc::WM_APP_WAKE;
