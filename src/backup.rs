//! Database backup taken when the launcher exits
//!
//! Copies the launcher database out of the user data folder into the local
//! application data directory, keeping a bounded number of copies.

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ShellError, ShellResult};

/// Database file name inside the user data folder
pub const DATABASE_FILE: &str = "lodestar.db";
const MANIFEST_FILE: &str = "backup.json";
const BACKUP_PREFIX: &str = "lodestar_";

/// Unit of work run on the exit path
pub trait BackupJob: Send + Sync {
    fn run(&self) -> ShellResult<()>;
}

/// Record of the last backup written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupManifest {
    pub source: PathBuf,
    pub file: PathBuf,
    pub source_modified: DateTime<Local>,
    pub created_at: DateTime<Local>,
    pub size: u64,
}

/// Copies `<user data>/lodestar.db` into a backup folder
#[derive(Debug, Clone)]
pub struct DatabaseBackup {
    source: PathBuf,
    backup_dir: PathBuf,
    keep: usize,
}

impl DatabaseBackup {
    pub fn new(user_data_folder: &Path, backup_dir: PathBuf, keep: usize) -> Self {
        Self {
            source: user_data_folder.join(DATABASE_FILE),
            backup_dir,
            keep: keep.max(1),
        }
    }

    /// Default backup folder under the local application data directory
    pub fn default_backup_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lodestar")
            .join("DatabaseBackup")
    }

    pub fn manifest(&self) -> Option<BackupManifest> {
        let content = fs::read_to_string(self.backup_dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn write_manifest(&self, manifest: &BackupManifest) -> ShellResult<()> {
        let content = serde_json::to_string_pretty(manifest)?;
        fs::write(self.backup_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    /// Backup files in the folder, oldest first
    pub fn backups(&self) -> ShellResult<Vec<PathBuf>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.backup_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(".db"))
            })
            .collect();
        // Timestamped names sort chronologically
        files.sort();
        Ok(files)
    }

    fn prune(&self) -> ShellResult<()> {
        let files = self.backups()?;
        if files.len() <= self.keep {
            return Ok(());
        }
        for old in &files[..files.len() - self.keep] {
            match fs::remove_file(old) {
                Ok(()) => debug!("Removed old backup {:?}", old),
                Err(e) => warn!("Failed to remove old backup {:?}: {}", old, e),
            }
        }
        Ok(())
    }

    fn unique_target(&self, now: DateTime<Local>) -> PathBuf {
        let stamp = now.format("%Y%m%d_%H%M%S");
        let mut target = self.backup_dir.join(format!("{}{}.db", BACKUP_PREFIX, stamp));
        let mut n = 1;
        while target.exists() {
            target = self
                .backup_dir
                .join(format!("{}{}_{}.db", BACKUP_PREFIX, stamp, n));
            n += 1;
        }
        target
    }
}

impl BackupJob for DatabaseBackup {
    fn run(&self) -> ShellResult<()> {
        let metadata = match fs::metadata(&self.source) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No database at {:?}, nothing to back up", self.source);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let source_modified: DateTime<Local> = metadata.modified()?.into();

        if let Some(manifest) = self.manifest() {
            if manifest.source_modified == source_modified && manifest.file.exists() {
                debug!("Database unchanged since {:?}, skipping backup", manifest.file);
                return Ok(());
            }
        }

        fs::create_dir_all(&self.backup_dir)?;
        let now = Local::now();
        let target = self.unique_target(now);
        let size = fs::copy(&self.source, &target)
            .map_err(|e| ShellError::Backup(format!("copy to {:?} failed: {}", target, e)))?;

        self.write_manifest(&BackupManifest {
            source: self.source.clone(),
            file: target.clone(),
            source_modified,
            created_at: now,
            size,
        })?;
        self.prune()?;

        info!("Database backed up to {:?} ({} bytes)", target, size);
        Ok(())
    }
}
