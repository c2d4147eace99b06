//! In-process notification bus
//!
//! Typed, synchronous publish/subscribe. Every registered handler sees each
//! published notification at most once, on the publishing thread. Handlers are
//! removed explicitly with [`EventBus::unsubscribe`].

use chrono::{DateTime, Local};
use log::{debug, trace};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Activation, hide or session-lock change of the main window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStateChange {
    pub activate: bool,
    pub hide: bool,
    pub session_lock: bool,
    pub current_time: DateTime<Local>,
    pub last_activated_time: Option<DateTime<Local>>,
}

impl WindowStateChange {
    pub fn activated(now: DateTime<Local>, last: DateTime<Local>) -> Self {
        Self {
            activate: true,
            hide: false,
            session_lock: false,
            current_time: now,
            last_activated_time: Some(last),
        }
    }

    pub fn hidden(now: DateTime<Local>) -> Self {
        Self {
            activate: false,
            hide: true,
            session_lock: false,
            current_time: now,
            last_activated_time: None,
        }
    }

    pub fn session_locked(now: DateTime<Local>) -> Self {
        Self {
            activate: false,
            hide: false,
            session_lock: true,
            current_time: now,
            last_activated_time: None,
        }
    }
}

/// Notifications exchanged between the shell and the rest of the launcher
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    AccentColorChanged,
    WelcomePageFinished,
    GameStarted,
    MainWindowStateChanged(WindowStateChange),
    RemovableStorageDeviceChanged,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::AccentColorChanged => NotificationKind::AccentColorChanged,
            Notification::WelcomePageFinished => NotificationKind::WelcomePageFinished,
            Notification::GameStarted => NotificationKind::GameStarted,
            Notification::MainWindowStateChanged(_) => NotificationKind::MainWindowStateChanged,
            Notification::RemovableStorageDeviceChanged => {
                NotificationKind::RemovableStorageDeviceChanged
            }
        }
    }
}

/// Discriminant used to filter subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    AccentColorChanged,
    WelcomePageFinished,
    GameStarted,
    MainWindowStateChanged,
    RemovableStorageDeviceChanged,
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;

struct Entry {
    id: u64,
    kinds: Vec<NotificationKind>,
    handler: Handler,
}

/// Notification bus
#[derive(Default)]
pub struct EventBus {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for the given kinds; an empty slice means every kind
    pub fn subscribe<F>(&self, kinds: &[NotificationKind], handler: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(Entry {
            id,
            kinds: kinds.to_vec(),
            handler: Arc::new(handler),
        });
        debug!("Subscription {} registered for {:?}", id, kinds);
        Subscription(id)
    }

    /// Remove a handler; returns false if it was not registered
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != subscription.0);
        before != entries.len()
    }

    /// Deliver `notification` to every matching handler and return how many ran
    pub fn publish(&self, notification: Notification) -> usize {
        let kind = notification.kind();
        // Snapshot so handlers may subscribe or publish without deadlocking
        let handlers: Vec<Handler> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.kinds.is_empty() || e.kinds.contains(&kind))
            .map(|e| e.handler.clone())
            .collect();

        trace!("Publishing {:?} to {} handler(s)", kind, handlers.len());
        for handler in &handlers {
            handler(&notification);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.entries.read().len()
    }
}
