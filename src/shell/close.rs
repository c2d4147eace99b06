//! Close policy and the exit-time backup

use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::backup::BackupJob;
use crate::config::CloseOption;
use crate::error::ShellResult;

/// What a close request resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Main view never loaded: quit without asking
    ExitImmediately,
    /// User cancelled the dialog; the window stays open
    StayOpen,
    Hide,
    Exit,
}

/// Result of asking the user which close option to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Cancelled,
    Confirmed(CloseOption),
}

/// Resolve a close request.
///
/// `prompt` runs only when the policy is [`CloseOption::AskEachTime`]. The
/// returned option, if any, must be persisted by the caller.
pub fn decide<P>(
    main_loaded: bool,
    policy: CloseOption,
    prompt: P,
) -> ShellResult<(CloseDecision, Option<CloseOption>)>
where
    P: FnOnce() -> ShellResult<PromptAnswer>,
{
    if !main_loaded {
        return Ok((CloseDecision::ExitImmediately, None));
    }
    match policy {
        CloseOption::Hide => Ok((CloseDecision::Hide, None)),
        CloseOption::Exit => Ok((CloseDecision::Exit, None)),
        CloseOption::AskEachTime => match prompt()? {
            PromptAnswer::Cancelled => Ok((CloseDecision::StayOpen, None)),
            PromptAnswer::Confirmed(CloseOption::Hide) => {
                Ok((CloseDecision::Hide, Some(CloseOption::Hide)))
            }
            PromptAnswer::Confirmed(CloseOption::Exit) => {
                Ok((CloseDecision::Exit, Some(CloseOption::Exit)))
            }
            // The dialog only offers Hide and Exit
            PromptAnswer::Confirmed(CloseOption::AskEachTime) => {
                Ok((CloseDecision::StayOpen, None))
            }
        },
    }
}

/// How the exit-time backup ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupWait {
    Completed,
    Failed,
    TimedOut,
    Skipped,
}

/// Backup job running on a worker thread while the UI keeps pumping.
///
/// The worker calls `notify` after reporting its result; the owner then polls.
/// A worker still running at the deadline is abandoned.
pub struct PendingBackup {
    rx: Receiver<ShellResult<()>>,
    deadline: Instant,
}

impl PendingBackup {
    /// Start `job`; `Err` carries the outcome when no worker could be started
    pub fn start<F>(job: Arc<dyn BackupJob>, timeout: Duration, notify: F) -> Result<Self, BackupWait>
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("exit-backup".to_string())
            .spawn(move || {
                let _ = tx.send(job.run());
                notify();
            });

        match spawned {
            Ok(_) => Ok(Self {
                rx,
                deadline: Instant::now() + timeout,
            }),
            Err(e) => {
                warn!("Failed to start backup thread: {}", e);
                Err(BackupWait::Failed)
            }
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Outcome as of `now`; `None` while the job may still finish in time
    pub fn poll(&self, now: Instant) -> Option<BackupWait> {
        match self.rx.try_recv() {
            Ok(Ok(())) => {
                debug!("Exit backup finished");
                Some(BackupWait::Completed)
            }
            Ok(Err(e)) => {
                warn!("Exit backup failed: {}", e);
                Some(BackupWait::Failed)
            }
            Err(TryRecvError::Empty) if now >= self.deadline => {
                info!("Exit backup still running at its deadline, giving up");
                Some(BackupWait::TimedOut)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("Exit backup thread ended without a result");
                Some(BackupWait::Failed)
            }
        }
    }

    /// Outcome once the timeout has fired
    pub fn expire(&self) -> BackupWait {
        self.poll(self.deadline).unwrap_or(BackupWait::TimedOut)
    }
}
