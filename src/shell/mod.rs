//! Main window shell
//!
//! [`Shell`] is the application context for the main window. It owns the
//! window host and the launcher services, reacts to platform events and
//! notifications, and runs the close sequence. Everything here runs on the UI
//! thread; the shell's bus subscriptions only queue notifications and wake the
//! window, so a handler never re-enters the shell.

pub mod close;
pub mod content;
pub mod dispatch;
pub mod slot;

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backup::{BackupJob, DatabaseBackup};
use crate::config::{CloseOption, Config, StartGameAction};
use crate::error::ShellResult;
use crate::events::{EventBus, Notification, NotificationKind, Subscription, WindowStateChange};
use crate::hotkey::HotkeyAction;
use crate::services::Services;
use crate::theme::{reevaluation_sequence, RequestedTheme};
use crate::utils::{
    centered_rect, needs_recenter, Point, Rect, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH,
};

use self::close::{decide, BackupWait, CloseDecision, PendingBackup, PromptAnswer};
use self::content::{ContentHost, ContentView};
use self::dispatch::{Disposition, PlatformEvent, RawMessage};
use self::slot::DeferredHandler;

/// Native window operations the shell needs
pub trait WindowHost {
    /// DPI scale factor of the window's display
    fn scale(&self) -> f64;
    /// Outer window rectangle in physical pixels
    fn outer_rect(&self) -> Rect;
    /// Work area of the display nearest to the pointer
    fn pointer_work_area(&self) -> Rect;
    fn move_and_resize(&mut self, rect: Rect) -> ShellResult<()>;
    fn show(&mut self);
    fn hide(&mut self);
    fn minimize(&mut self);
    fn set_cursor_pos(&mut self, point: Point);
    fn set_content(&mut self, view: ContentView);
    fn actual_theme_is_dark(&self) -> bool;
    fn request_theme(&mut self, theme: RequestedTheme);
    fn ensure_tray(&mut self) -> ShellResult<()>;
    /// Modal close-option dialog
    fn prompt_close_option(&mut self) -> ShellResult<PromptAnswer>;
    /// Close the native window without ending the process
    fn close(&mut self);
    /// Arrange for [`Shell::on_exit_timer`] to run once `timeout` has passed
    fn start_exit_timer(&mut self, timeout: Duration);
    /// End the message loop
    fn quit(&mut self);
}

/// Outcome of a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    ExitedImmediately,
    StayedOpen,
    Hidden,
    Exiting(ExitProgress),
    /// Another close request was still being handled
    AlreadyClosing,
}

/// Where the exit sequence stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitProgress {
    NotExiting,
    /// Window closed, backup still running
    Waiting,
    /// Message loop told to end
    Finished(BackupWait),
}

type Wake = Arc<dyn Fn() + Send + Sync>;

/// Configuration shared with the rest of the launcher
#[derive(Clone)]
pub struct SharedConfig {
    pub config: Arc<RwLock<Config>>,
    pub path: PathBuf,
}

impl SharedConfig {
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            path,
        }
    }

    fn set_close_option(&self, option: CloseOption) -> ShellResult<()> {
        let mut config = self.config.write();
        config.general.close_window_option = option;
        config.save_to(&self.path)
    }
}

/// Main window shell
pub struct Shell<W: WindowHost, S: Services> {
    window: W,
    services: S,
    settings: SharedConfig,
    bus: Arc<EventBus>,
    content: ContentHost,
    last_activated: DateTime<Local>,
    closing: bool,
    inbox: Receiver<Notification>,
    subscriptions: Vec<Subscription>,
    backup: Option<Arc<dyn BackupJob>>,
    wake: Wake,
    pending_exit: Option<PendingBackup>,
}

impl<W: WindowHost, S: Services> Shell<W, S> {
    /// Create the shell and load the first view.
    ///
    /// `wake` is called from the bus whenever a notification for the shell was
    /// queued; it must arrange for [`Shell::pump_notifications`] to run on the
    /// UI thread.
    pub fn new<F>(window: W, services: S, settings: SharedConfig, bus: Arc<EventBus>, wake: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let wake: Wake = Arc::new(wake);
        let (tx, inbox) = mpsc::channel();
        let notify = wake.clone();
        let subscription = bus.subscribe(
            &[
                NotificationKind::AccentColorChanged,
                NotificationKind::WelcomePageFinished,
                NotificationKind::GameStarted,
            ],
            move |n| {
                if tx.send(n.clone()).is_ok() {
                    notify();
                }
            },
        );

        let content = ContentHost::initial(settings.config.read().user_data_folder());

        let mut shell = Self {
            window,
            services,
            settings,
            bus,
            content,
            last_activated: Local::now(),
            closing: false,
            inbox,
            subscriptions: vec![subscription],
            backup: None,
            wake,
            pending_exit: None,
        };
        shell.load_content_view();
        shell
    }

    /// Use `job` instead of the configured database backup on exit
    pub fn with_backup(mut self, job: Arc<dyn BackupJob>) -> Self {
        self.backup = Some(job);
        self
    }

    fn load_content_view(&mut self) {
        let view = self.content.view();
        info!("Loading {:?} view", view);
        self.window.set_content(view);
        if view == ContentView::Main {
            self.ensure_tray();
        }
    }

    fn ensure_tray(&mut self) {
        if let Err(e) = self.window.ensure_tray() {
            warn!("Failed to create tray icon: {}", e);
        }
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn content(&self) -> ContentView {
        self.content.view()
    }

    pub fn main_loaded(&self) -> bool {
        self.content.main_loaded()
    }

    /// Centre on the pointer's display; sizes are logical, `None` keeps the current size
    pub fn center_in_screen(&mut self, width: Option<i32>, height: Option<i32>) {
        let work_area = self.window.pointer_work_area();
        if work_area.is_empty() {
            warn!("No usable work area, keeping window at {:?}", self.window.outer_rect());
            return;
        }
        let rect = centered_rect(
            work_area,
            self.window.outer_rect().size(),
            width,
            height,
            self.window.scale(),
        );
        if let Err(e) = self.window.move_and_resize(rect) {
            warn!("Failed to move window to {:?}: {}", rect, e);
        }
    }

    fn center_default(&mut self) {
        self.center_in_screen(Some(DEFAULT_WINDOW_WIDTH), Some(DEFAULT_WINDOW_HEIGHT));
    }

    /// Show the window, re-centring it if it no longer has its default size
    pub fn show(&mut self) {
        if needs_recenter(self.window.outer_rect().size(), self.window.scale()) {
            self.center_default();
        }
        self.window.show();
    }

    /// Show the window centred with the pointer on it
    pub fn show_by_gamepad(&mut self) {
        self.center_default();
        let center = self.window.outer_rect().center();
        self.window.set_cursor_pos(center);
        self.window.show();
    }

    pub fn hide(&mut self) {
        self.window.hide();
        self.bus
            .publish(Notification::MainWindowStateChanged(WindowStateChange::hidden(Local::now())));
    }

    pub fn minimize(&mut self) {
        self.window.minimize();
    }

    /// Handle a raw window message
    pub fn handle_message(&mut self, raw: &RawMessage) -> Disposition {
        let disposition = self.on_event(PlatformEvent::translate(raw));
        self.pump_notifications();
        disposition
    }

    /// React to a platform event
    pub fn on_event(&mut self, event: PlatformEvent) -> Disposition {
        match event {
            PlatformEvent::Activated => {
                let now = Local::now();
                self.bus.publish(Notification::MainWindowStateChanged(
                    WindowStateChange::activated(now, self.last_activated),
                ));
                self.last_activated = now;
                Disposition::Default
            }
            // Double-clicking the drag region must not maximize
            PlatformEvent::MaximizeRequested => Disposition::Swallow,
            PlatformEvent::SessionLocked => {
                self.bus.publish(Notification::MainWindowStateChanged(
                    WindowStateChange::session_locked(Local::now()),
                ));
                Disposition::Default
            }
            PlatformEvent::SessionUnlocked => Disposition::Default,
            PlatformEvent::StorageVolumeChanged => {
                self.bus.publish(Notification::RemovableStorageDeviceChanged);
                Disposition::Default
            }
            PlatformEvent::Hotkey(HotkeyAction::ToggleOverlay) => {
                if !self.services.open_overlay() {
                    self.show();
                }
                Disposition::Default
            }
            PlatformEvent::Hotkey(HotkeyAction::Screenshot) => {
                self.services.capture_screen();
                Disposition::Default
            }
            PlatformEvent::CloseRequested => {
                let outcome = self.request_close();
                debug!("Close request ended with {:?}", outcome);
                Disposition::Swallow
            }
            PlatformEvent::EscapePressed => {
                if self.main_loaded() {
                    self.hide();
                }
                Disposition::Default
            }
            PlatformEvent::ColorSettingChanged => {
                self.bus.publish(Notification::AccentColorChanged);
                Disposition::Default
            }
            PlatformEvent::Unhandled => Disposition::Default,
        }
    }

    /// Drain notifications queued by the shell's bus subscription
    pub fn pump_notifications(&mut self) {
        while let Ok(notification) = self.inbox.try_recv() {
            self.handle_notification(&notification);
        }
    }

    fn handle_notification(&mut self, notification: &Notification) {
        match notification {
            Notification::WelcomePageFinished => {
                if self.content.finish_welcome() {
                    self.load_content_view();
                }
            }
            Notification::AccentColorChanged => {
                for theme in reevaluation_sequence(self.window.actual_theme_is_dark()) {
                    self.window.request_theme(theme);
                }
            }
            Notification::GameStarted => {
                if self.main_loaded() {
                    let action = self.settings.config.read().general.start_game_action;
                    match action {
                        StartGameAction::Hide => self.hide(),
                        StartGameAction::Minimize => self.minimize(),
                        StartGameAction::DoNothing => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Handle the close button; never fails
    pub fn request_close(&mut self) -> CloseOutcome {
        if self.closing || self.pending_exit.is_some() {
            debug!("Close already in progress, ignoring request");
            return CloseOutcome::AlreadyClosing;
        }
        self.closing = true;
        let outcome = self.run_close();
        self.closing = false;
        outcome
    }

    fn run_close(&mut self) -> CloseOutcome {
        let main_loaded = self.main_loaded();
        let policy = self.settings.config.read().general.close_window_option;
        let window = &mut self.window;

        let (decision, chosen) = match decide(main_loaded, policy, || window.prompt_close_option()) {
            Ok(r) => r,
            Err(e) => {
                warn!("Close confirmation failed, keeping window open: {}", e);
                return CloseOutcome::StayedOpen;
            }
        };

        if let Some(option) = chosen {
            if let Err(e) = self.settings.set_close_option(option) {
                warn!("Failed to persist close option {:?}: {}", option, e);
            }
        }

        match decision {
            CloseDecision::ExitImmediately => {
                info!("Main view never loaded, exiting");
                self.teardown();
                self.window.quit();
                CloseOutcome::ExitedImmediately
            }
            CloseDecision::StayOpen => CloseOutcome::StayedOpen,
            CloseDecision::Hide => {
                self.hide();
                CloseOutcome::Hidden
            }
            CloseDecision::Exit => CloseOutcome::Exiting(self.exit()),
        }
    }

    /// Close the window and start the exit backup.
    ///
    /// Returns without waiting for the backup; the message loop ends from
    /// [`Shell::poll_exit`] or [`Shell::on_exit_timer`], whichever sees the
    /// outcome first.
    pub fn exit(&mut self) -> ExitProgress {
        if self.pending_exit.is_some() {
            return ExitProgress::Waiting;
        }
        info!("Exiting Lodestar");
        self.window.close();
        self.services.unregister_hotkeys();
        self.services.restore_gamepad_guide_button();

        let Some(job) = self.exit_backup() else {
            return self.finish_exit(BackupWait::Skipped);
        };
        let timeout = Duration::from_secs(self.settings.config.read().backup.timeout_secs);
        let wake = self.wake.clone();
        match PendingBackup::start(job, timeout, move || wake()) {
            Ok(pending) => {
                let remaining = pending.deadline().saturating_duration_since(Instant::now());
                self.window.start_exit_timer(remaining);
                self.pending_exit = Some(pending);
                ExitProgress::Waiting
            }
            Err(wait) => self.finish_exit(wait),
        }
    }

    /// Finish exiting if the backup has reported or its deadline passed
    pub fn poll_exit(&mut self) -> ExitProgress {
        let outcome = match &self.pending_exit {
            None => return ExitProgress::NotExiting,
            Some(pending) => pending.poll(Instant::now()),
        };
        match outcome {
            Some(wait) => self.finish_exit(wait),
            None => ExitProgress::Waiting,
        }
    }

    /// The exit timeout fired: stop waiting for the backup
    pub fn on_exit_timer(&mut self) -> ExitProgress {
        match self.pending_exit.as_ref().map(PendingBackup::expire) {
            Some(wait) => self.finish_exit(wait),
            None => ExitProgress::NotExiting,
        }
    }

    fn finish_exit(&mut self, wait: BackupWait) -> ExitProgress {
        info!("Exit backup ended with {:?}", wait);
        self.pending_exit = None;
        self.teardown();
        self.window.quit();
        ExitProgress::Finished(wait)
    }

    fn exit_backup(&self) -> Option<Arc<dyn BackupJob>> {
        if let Some(job) = &self.backup {
            return Some(job.clone());
        }
        let config = self.settings.config.read();
        if !config.backup.on_exit {
            return None;
        }
        let folder = config.user_data_folder()?;
        Some(Arc::new(DatabaseBackup::new(
            folder,
            DatabaseBackup::default_backup_dir(),
            config.backup.keep,
        )))
    }

    /// Drop the shell's bus subscriptions
    pub fn teardown(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            self.bus.unsubscribe(subscription);
        }
    }
}

impl<W: WindowHost, S: Services> DeferredHandler for Shell<W, S> {
    fn replay(&mut self, raw: &RawMessage) {
        self.handle_message(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShellError;
    use crate::services::DetachedServices;
    use crate::utils::Size;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{tempdir, TempDir};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Move(Rect),
        Show,
        Hide,
        Minimize,
        Cursor(Point),
        Content(ContentView),
        Theme(RequestedTheme),
        Tray,
        Prompt,
        Close,
        ExitTimer(Duration),
        Quit,
    }

    struct FakeWindow {
        rect: Rect,
        scale: f64,
        work_area: Rect,
        dark: bool,
        answer: Option<PromptAnswer>,
        calls: Vec<Call>,
    }

    impl FakeWindow {
        fn new() -> Self {
            Self {
                rect: Rect::new(0, 0, 1200, 676),
                scale: 1.0,
                work_area: Rect::new(0, 0, 1920, 1040),
                dark: false,
                answer: None,
                calls: Vec::new(),
            }
        }

        fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    impl WindowHost for FakeWindow {
        fn scale(&self) -> f64 {
            self.scale
        }
        fn outer_rect(&self) -> Rect {
            self.rect
        }
        fn pointer_work_area(&self) -> Rect {
            self.work_area
        }
        fn move_and_resize(&mut self, rect: Rect) -> ShellResult<()> {
            self.rect = rect;
            self.calls.push(Call::Move(rect));
            Ok(())
        }
        fn show(&mut self) {
            self.calls.push(Call::Show);
        }
        fn hide(&mut self) {
            self.calls.push(Call::Hide);
        }
        fn minimize(&mut self) {
            self.calls.push(Call::Minimize);
        }
        fn set_cursor_pos(&mut self, point: Point) {
            self.calls.push(Call::Cursor(point));
        }
        fn set_content(&mut self, view: ContentView) {
            self.calls.push(Call::Content(view));
        }
        fn actual_theme_is_dark(&self) -> bool {
            self.dark
        }
        fn request_theme(&mut self, theme: RequestedTheme) {
            self.calls.push(Call::Theme(theme));
        }
        fn ensure_tray(&mut self) -> ShellResult<()> {
            self.calls.push(Call::Tray);
            Ok(())
        }
        fn prompt_close_option(&mut self) -> ShellResult<PromptAnswer> {
            self.calls.push(Call::Prompt);
            self.answer
                .ok_or_else(|| ShellError::Dialog("no answer scripted".to_string()))
        }
        fn close(&mut self) {
            self.calls.push(Call::Close);
        }
        fn start_exit_timer(&mut self, timeout: Duration) {
            self.calls.push(Call::ExitTimer(timeout));
        }
        fn quit(&mut self) {
            self.calls.push(Call::Quit);
        }
    }

    #[derive(Default)]
    struct FakeServices {
        overlay_opens: bool,
        overlay_calls: usize,
        captures: usize,
        gamepad_restored: bool,
        inner: DetachedServices,
    }

    impl Services for FakeServices {
        fn open_overlay(&mut self) -> bool {
            self.overlay_calls += 1;
            self.overlay_opens
        }
        fn capture_screen(&mut self) {
            self.captures += 1;
        }
        fn restore_gamepad_guide_button(&mut self) {
            self.gamepad_restored = true;
        }
        fn unregister_hotkeys(&mut self) {
            self.inner.unregister_hotkeys();
        }
    }

    struct CountingJob(Arc<AtomicUsize>);

    impl BackupJob for CountingJob {
        fn run(&self) -> ShellResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct HangingJob;

    impl BackupJob for HangingJob {
        fn run(&self) -> ShellResult<()> {
            std::thread::sleep(Duration::from_secs(30));
            Ok(())
        }
    }

    struct Fixture {
        shell: Shell<FakeWindow, FakeServices>,
        bus: Arc<EventBus>,
        settings: SharedConfig,
        published: Arc<Mutex<Vec<Notification>>>,
        _dir: TempDir,
    }

    fn fixture_with(configure: impl FnOnce(&mut Config), window: FakeWindow) -> Fixture {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.general.user_data_folder = Some(dir.path().join("data"));
        configure(&mut config);
        let settings = SharedConfig::new(config, dir.path().join("config.toml"));

        let bus = Arc::new(EventBus::new());
        let published = Arc::new(Mutex::new(Vec::new()));
        let p = published.clone();
        bus.subscribe(
            &[
                NotificationKind::MainWindowStateChanged,
                NotificationKind::RemovableStorageDeviceChanged,
            ],
            move |n| p.lock().push(n.clone()),
        );

        let shell = Shell::new(
            window,
            FakeServices::default(),
            settings.clone(),
            bus.clone(),
            || {},
        );
        Fixture {
            shell,
            bus,
            settings,
            published,
            _dir: dir,
        }
    }

    fn fixture(configure: impl FnOnce(&mut Config)) -> Fixture {
        fixture_with(configure, FakeWindow::new())
    }

    fn session_locks(published: &[Notification]) -> usize {
        published
            .iter()
            .filter(|n| matches!(n, Notification::MainWindowStateChanged(s) if s.session_lock))
            .count()
    }

    #[test]
    fn first_run_starts_on_welcome_without_tray() {
        let f = fixture(|c| c.general.user_data_folder = None);
        assert_eq!(f.shell.content(), ContentView::Welcome);
        assert_eq!(f.shell.window().calls, vec![Call::Content(ContentView::Welcome)]);
    }

    #[test]
    fn welcome_finished_switches_to_main_once() {
        let mut f = fixture(|c| c.general.user_data_folder = None);
        f.bus.publish(Notification::WelcomePageFinished);
        f.shell.pump_notifications();
        assert_eq!(f.shell.content(), ContentView::Main);
        assert!(f.shell.main_loaded());
        assert_eq!(f.shell.window().count(&Call::Tray), 1);

        f.bus.publish(Notification::WelcomePageFinished);
        f.shell.pump_notifications();
        assert_eq!(f.shell.window().count(&Call::Content(ContentView::Main)), 1);
    }

    #[test]
    fn configured_folder_starts_on_main_with_tray() {
        let f = fixture(|_| {});
        assert_eq!(f.shell.content(), ContentView::Main);
        assert_eq!(
            f.shell.window().calls,
            vec![Call::Content(ContentView::Main), Call::Tray]
        );
    }

    #[test]
    fn center_in_screen_uses_scale_and_work_area() {
        let mut window = FakeWindow::new();
        window.scale = 1.5;
        window.work_area = Rect::new(1920, 0, 2560, 1400);
        let mut f = fixture_with(|_| {}, window);

        f.shell.center_in_screen(Some(1200), Some(676));
        let r = f.shell.window().rect;
        assert_eq!(r.size(), Size::new(1800, 1014));
        assert_eq!(r.center(), Point::new(1920 + 1280, 700));

        f.shell.center_in_screen(None, None);
        assert_eq!(f.shell.window().rect.size(), Size::new(1800, 1014));
    }

    #[test]
    fn show_recenters_only_when_size_drifted() {
        let mut f = fixture(|_| {});
        f.shell.window_mut().rect = Rect::new(5, 5, 1205, 670);
        f.shell.show();
        assert!(!f.shell.window().calls.iter().any(|c| matches!(c, Call::Move(_))));
        assert_eq!(f.shell.window().calls.last(), Some(&Call::Show));

        f.shell.window_mut().rect = Rect::new(5, 5, 900, 600);
        f.shell.show();
        assert_eq!(f.shell.window().rect.size(), Size::new(1200, 676));
        assert_eq!(f.shell.window().calls.last(), Some(&Call::Show));
    }

    #[test]
    fn show_by_gamepad_moves_pointer_to_center() {
        let mut f = fixture(|_| {});
        f.shell.show_by_gamepad();
        let center = f.shell.window().rect.center();
        let calls = &f.shell.window().calls;
        assert!(calls.contains(&Call::Cursor(center)));
        assert_eq!(calls.last(), Some(&Call::Show));
    }

    #[test]
    fn activation_carries_previous_time() {
        let mut f = fixture(|_| {});
        f.shell.on_event(PlatformEvent::Activated);
        f.shell.on_event(PlatformEvent::Activated);

        let published = f.published.lock();
        let states: Vec<&WindowStateChange> = published
            .iter()
            .filter_map(|n| match n {
                Notification::MainWindowStateChanged(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(states.len(), 2);
        assert!(states.iter().all(|s| s.activate));
        assert_eq!(states[1].last_activated_time, Some(states[0].current_time));
    }

    #[test]
    fn session_lock_publishes_exactly_once_and_unlock_never() {
        let mut f = fixture(|_| {});
        let lock = RawMessage::new(dispatch::WM_WTSSESSION_CHANGE, 7);
        let unlock = RawMessage::new(dispatch::WM_WTSSESSION_CHANGE, 8);

        assert_eq!(f.shell.handle_message(&lock), Disposition::Default);
        assert_eq!(session_locks(&f.published.lock()), 1);

        f.shell.handle_message(&unlock);
        assert_eq!(f.published.lock().len(), 1);
    }

    #[test]
    fn non_volume_device_change_is_ignored() {
        let mut f = fixture(|_| {});
        let mut raw = RawMessage::new(dispatch::WM_DEVICECHANGE, dispatch::DBT_DEVICEARRIVAL);
        raw.device_type = Some(5);
        f.shell.handle_message(&raw);
        assert!(f.published.lock().is_empty());

        raw.device_type = Some(dispatch::DBT_DEVTYP_VOLUME);
        f.shell.handle_message(&raw);
        assert_eq!(
            *f.published.lock(),
            vec![Notification::RemovableStorageDeviceChanged]
        );
    }

    #[test]
    fn maximize_is_swallowed() {
        let mut f = fixture(|_| {});
        let raw = RawMessage::new(dispatch::WM_SYSCOMMAND, 0xF032);
        assert_eq!(f.shell.handle_message(&raw), Disposition::Swallow);
        let raw = RawMessage::new(dispatch::WM_SYSCOMMAND, 0xF020);
        assert_eq!(f.shell.handle_message(&raw), Disposition::Default);
    }

    #[test]
    fn overlay_hotkey_falls_back_to_showing_window() {
        let mut f = fixture(|_| {});
        f.shell.on_event(PlatformEvent::Hotkey(HotkeyAction::ToggleOverlay));
        assert_eq!(f.shell.services().overlay_calls, 1);
        assert_eq!(f.shell.window().calls.last(), Some(&Call::Show));

        f.shell.services.overlay_opens = true;
        let before = f.shell.window().count(&Call::Show);
        f.shell.on_event(PlatformEvent::Hotkey(HotkeyAction::ToggleOverlay));
        assert_eq!(f.shell.window().count(&Call::Show), before);

        f.shell.on_event(PlatformEvent::Hotkey(HotkeyAction::Screenshot));
        assert_eq!(f.shell.services().captures, 1);
    }

    #[test]
    fn escape_hides_only_when_main_loaded() {
        let mut f = fixture(|c| c.general.user_data_folder = None);
        f.shell.on_event(PlatformEvent::EscapePressed);
        assert_eq!(f.shell.window().count(&Call::Hide), 0);

        let mut f = fixture(|_| {});
        f.shell.on_event(PlatformEvent::EscapePressed);
        assert_eq!(f.shell.window().count(&Call::Hide), 1);
        assert!(matches!(
            f.published.lock().last(),
            Some(Notification::MainWindowStateChanged(s)) if s.hide
        ));
    }

    #[test]
    fn accent_change_flips_theme_and_restores_default() {
        let mut window = FakeWindow::new();
        window.dark = true;
        let mut f = fixture_with(|_| {}, window);

        let raw = RawMessage::new(dispatch::WM_DWMCOLORIZATIONCOLORCHANGED, 0);
        f.shell.handle_message(&raw);

        let themes: Vec<&Call> = f
            .shell
            .window()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Theme(_)))
            .collect();
        assert_eq!(
            themes,
            vec![
                &Call::Theme(RequestedTheme::Light),
                &Call::Theme(RequestedTheme::Default)
            ]
        );
    }

    #[test]
    fn game_started_follows_start_game_action() {
        let mut f = fixture(|c| c.general.start_game_action = StartGameAction::Minimize);
        f.bus.publish(Notification::GameStarted);
        f.shell.pump_notifications();
        assert_eq!(f.shell.window().count(&Call::Minimize), 1);

        let mut f = fixture(|c| c.general.start_game_action = StartGameAction::Hide);
        f.bus.publish(Notification::GameStarted);
        f.shell.pump_notifications();
        assert_eq!(f.shell.window().count(&Call::Hide), 1);

        let mut f = fixture(|c| c.general.user_data_folder = None);
        f.bus.publish(Notification::GameStarted);
        f.shell.pump_notifications();
        assert_eq!(f.shell.window().count(&Call::Hide), 0);
    }

    #[test]
    fn close_before_main_view_exits_immediately() {
        let mut f = fixture(|c| c.general.user_data_folder = None);
        assert_eq!(f.shell.request_close(), CloseOutcome::ExitedImmediately);
        assert_eq!(f.shell.window().count(&Call::Prompt), 0);
        assert_eq!(f.shell.window().count(&Call::Quit), 1);
        assert_eq!(f.bus.subscriber_count(), 1);
    }

    #[test]
    fn close_with_hide_policy_never_quits() {
        let mut f = fixture(|c| c.general.close_window_option = CloseOption::Hide);
        for _ in 0..3 {
            assert_eq!(f.shell.request_close(), CloseOutcome::Hidden);
        }
        assert_eq!(f.shell.window().count(&Call::Hide), 3);
        assert_eq!(f.shell.window().count(&Call::Quit), 0);
    }

    /// Poll the pending exit the way the wake message would
    fn settle_exit<W: WindowHost, S: Services>(shell: &mut Shell<W, S>) -> ExitProgress {
        for _ in 0..500 {
            match shell.poll_exit() {
                ExitProgress::Waiting => std::thread::sleep(Duration::from_millis(10)),
                done => return done,
            }
        }
        ExitProgress::Waiting
    }

    #[test]
    fn close_with_exit_policy_runs_exit_sequence() {
        let runs = Arc::new(AtomicUsize::new(0));
        let f = fixture(|c| c.general.close_window_option = CloseOption::Exit);
        let mut shell = f.shell.with_backup(Arc::new(CountingJob(runs.clone())));

        assert_eq!(
            shell.request_close(),
            CloseOutcome::Exiting(ExitProgress::Waiting)
        );
        assert!(shell.services().inner.hotkeys_released);
        assert!(shell.services().gamepad_restored);
        assert_eq!(shell.window().count(&Call::Quit), 0);

        assert_eq!(
            settle_exit(&mut shell),
            ExitProgress::Finished(BackupWait::Completed)
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        let calls = &shell.window().calls;
        assert_eq!(calls.iter().filter(|c| **c == Call::Close).count(), 1);
        assert_eq!(calls.last(), Some(&Call::Quit));
        assert_eq!(shell.poll_exit(), ExitProgress::NotExiting);
    }

    #[test]
    fn close_handler_returns_while_backup_hangs() {
        let mut f = fixture(|c| c.general.close_window_option = CloseOption::Exit);
        f.shell = f.shell.with_backup(Arc::new(HangingJob));

        let start = std::time::Instant::now();
        let raw = RawMessage::new(dispatch::WM_CLOSE, 0);
        assert_eq!(f.shell.handle_message(&raw), Disposition::Swallow);
        assert!(start.elapsed() < Duration::from_secs(1));

        let calls = &f.shell.window().calls;
        assert!(calls
            .iter()
            .any(|c| matches!(c, Call::ExitTimer(t) if *t <= Duration::from_secs(30))));
        assert_eq!(f.shell.window().count(&Call::Quit), 0);
        assert_eq!(f.shell.poll_exit(), ExitProgress::Waiting);

        // Further close requests while the backup runs are absorbed
        assert_eq!(f.shell.request_close(), CloseOutcome::AlreadyClosing);

        assert_eq!(
            f.shell.on_exit_timer(),
            ExitProgress::Finished(BackupWait::TimedOut)
        );
        assert_eq!(f.shell.window().count(&Call::Quit), 1);
        assert_eq!(f.bus.subscriber_count(), 1);
    }

    #[test]
    fn exit_without_backup_quits_at_once() {
        let f = fixture(|c| c.backup.on_exit = false);
        let mut shell = f.shell;
        assert_eq!(shell.exit(), ExitProgress::Finished(BackupWait::Skipped));
        assert_eq!(shell.window().calls.last(), Some(&Call::Quit));
        assert!(!shell
            .window()
            .calls
            .iter()
            .any(|c| matches!(c, Call::ExitTimer(_))));
    }

    #[test]
    fn exit_timer_after_completion_is_ignored() {
        let f = fixture(|c| c.backup.on_exit = false);
        let mut shell = f.shell;
        shell.exit();
        assert_eq!(shell.on_exit_timer(), ExitProgress::NotExiting);
        assert_eq!(shell.window().count(&Call::Quit), 1);
    }

    #[test]
    fn cancelled_prompt_keeps_window_and_policy() {
        let mut window = FakeWindow::new();
        window.answer = Some(PromptAnswer::Cancelled);
        let mut f = fixture_with(|_| {}, window);

        assert_eq!(f.shell.request_close(), CloseOutcome::StayedOpen);
        assert_eq!(
            f.settings.config.read().general.close_window_option,
            CloseOption::AskEachTime
        );
        assert!(!f.settings.path.exists());
        assert_eq!(f.shell.window().count(&Call::Hide), 0);
        assert_eq!(f.shell.window().count(&Call::Quit), 0);
    }

    #[test]
    fn confirmed_prompt_persists_choice() {
        let mut window = FakeWindow::new();
        window.answer = Some(PromptAnswer::Confirmed(CloseOption::Hide));
        let mut f = fixture_with(|_| {}, window);

        assert_eq!(f.shell.request_close(), CloseOutcome::Hidden);
        assert_eq!(
            f.settings.config.read().general.close_window_option,
            CloseOption::Hide
        );
        let saved = Config::load_or_default_from(&f.settings.path).unwrap();
        assert_eq!(saved.general.close_window_option, CloseOption::Hide);

        // the next close no longer asks
        assert_eq!(f.shell.request_close(), CloseOutcome::Hidden);
        assert_eq!(f.shell.window().count(&Call::Prompt), 1);
    }

    #[test]
    fn dialog_failure_keeps_window_open() {
        let mut f = fixture(|_| {});
        assert_eq!(f.shell.request_close(), CloseOutcome::StayedOpen);
        assert_eq!(f.shell.window().count(&Call::Prompt), 1);
    }

    #[test]
    fn reentrant_close_is_absorbed() {
        let mut f = fixture(|c| c.general.close_window_option = CloseOption::Hide);
        f.shell.closing = true;
        assert_eq!(f.shell.request_close(), CloseOutcome::AlreadyClosing);
        assert_eq!(f.shell.window().count(&Call::Hide), 0);

        f.shell.closing = false;
        assert_eq!(f.shell.request_close(), CloseOutcome::Hidden);
    }

    #[test]
    fn session_lock_queued_during_close_prompt_is_published_when_it_ends() {
        use super::slot::ShellSlot;

        let mut window = FakeWindow::new();
        window.answer = Some(PromptAnswer::Cancelled);
        let f = fixture_with(|_| {}, window);
        let published = f.published.clone();

        let slot = ShellSlot::new();
        slot.install(f.shell);
        slot.with(|shell| {
            assert_eq!(shell.request_close(), CloseOutcome::StayedOpen);
            // Delivered by the dialog's nested loop while the shell is borrowed
            assert!(slot.with(|_| ()).is_none());
            slot.defer(RawMessage::new(dispatch::WM_WTSSESSION_CHANGE, 7));
            assert!(slot.with(|_| ()).is_none());
        })
        .unwrap();

        assert_eq!(slot.pending(), 0);
        assert_eq!(session_locks(&published.lock()), 1);
    }

    #[test]
    fn empty_work_area_keeps_window_in_place() {
        let mut window = FakeWindow::new();
        window.work_area = Rect::default();
        let mut f = fixture_with(|_| {}, window);
        f.shell.center_in_screen(Some(1200), Some(676));
        assert!(!f.shell.window().calls.iter().any(|c| matches!(c, Call::Move(_))));
    }

    #[test]
    fn close_message_is_swallowed() {
        let mut f = fixture(|c| c.general.close_window_option = CloseOption::Hide);
        let raw = RawMessage::new(dispatch::WM_CLOSE, 0);
        assert_eq!(f.shell.handle_message(&raw), Disposition::Swallow);
        assert_eq!(f.shell.window().count(&Call::Hide), 1);
    }

    #[test]
    fn wake_runs_when_shell_notification_is_queued() {
        let woke = Arc::new(AtomicUsize::new(0));
        let w = woke.clone();
        let dir = tempdir().unwrap();
        let settings = SharedConfig::new(Config::default(), dir.path().join("config.toml"));
        let bus = Arc::new(EventBus::new());
        let mut shell = Shell::new(
            FakeWindow::new(),
            FakeServices::default(),
            settings,
            bus.clone(),
            move || {
                w.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.publish(Notification::RemovableStorageDeviceChanged);
        assert_eq!(woke.load(Ordering::SeqCst), 0);
        bus.publish(Notification::GameStarted);
        assert_eq!(woke.load(Ordering::SeqCst), 1);

        shell.teardown();
        assert_eq!(bus.subscriber_count(), 0);
    }
}
