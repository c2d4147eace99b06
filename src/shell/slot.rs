//! Borrow slot for the shell on the UI thread
//!
//! Win32 re-enters the window procedure from nested message loops (modal
//! dialogs, menus) and from our own synchronous calls. A message that arrives
//! while the shell is borrowed is queued, and the queue is drained by whoever
//! holds the borrow before giving it back. Nothing waits for a later wake.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::dispatch::RawMessage;

/// Something that can process a message that had to wait
pub trait DeferredHandler {
    fn replay(&mut self, raw: &RawMessage);
}

pub struct ShellSlot<T> {
    shell: RefCell<Option<T>>,
    deferred: RefCell<VecDeque<RawMessage>>,
}

impl<T: DeferredHandler> ShellSlot<T> {
    pub const fn new() -> Self {
        Self {
            shell: RefCell::new(None),
            deferred: RefCell::new(VecDeque::new()),
        }
    }

    pub fn install(&self, shell: T) {
        *self.shell.borrow_mut() = Some(shell);
    }

    /// Remove the shell; `None` if absent or currently borrowed
    pub fn take(&self) -> Option<T> {
        self.shell.try_borrow_mut().ok().and_then(|mut s| s.take())
    }

    /// Run `f` with the shell, then replay everything queued meanwhile.
    ///
    /// `None` if the shell is not installed or already borrowed further up
    /// the stack; that borrower replays the queue when it finishes.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.shell.try_borrow_mut().ok()?;
        let shell = guard.as_mut()?;
        let result = f(shell);
        loop {
            // Release the queue before replaying; replay may defer again
            let next = self.deferred.borrow_mut().pop_front();
            match next {
                Some(raw) => shell.replay(&raw),
                None => break,
            }
        }
        Some(result)
    }

    pub fn defer(&self, raw: RawMessage) {
        self.deferred.borrow_mut().push_back(raw);
    }

    pub fn pending(&self) -> usize {
        self.deferred.borrow().len()
    }
}

impl<T: DeferredHandler> Default for ShellSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
