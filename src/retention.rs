//! Timestamped backup folders and age-based pruning.
//!
//! The backup root's immediate subdirectories named `YYYYMMDD_HHMMSS` are the
//! only record of past runs. Anything else in the backup root is left alone.

use crate::Result;
use chrono::{Duration, Local, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Folder name format of a backup run (local time at run start)
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Default retention window in days
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Second-precision label identifying one backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackupStamp(NaiveDateTime);

impl BackupStamp {
    /// Stamp for the current local time
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    /// Build a stamp, dropping sub-second precision
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    /// Parse a folder name. Only the exact 15-character `YYYYMMDD_HHMMSS`
    /// shape is accepted.
    pub fn parse(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        let shape_ok = bytes.len() == 15
            && bytes.iter().enumerate().all(|(i, b)| {
                if i == 8 {
                    *b == b'_'
                } else {
                    b.is_ascii_digit()
                }
            });
        if !shape_ok {
            return None;
        }

        NaiveDateTime::parse_from_str(name, STAMP_FORMAT)
            .ok()
            .map(Self)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for BackupStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

impl Serialize for BackupStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A managed backup folder found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub stamp: BackupStamp,
}

/// List managed backup folders, in lexicographic (and so chronological) order.
///
/// A missing backup root yields an empty list. Files, symlinks and folders
/// whose name is not a stamp are ignored.
pub fn list_backups(backup_root: &Path) -> Result<Vec<BackupEntry>> {
    if !backup_root.exists() {
        return Ok(Vec::new());
    }

    let mut children = Vec::new();
    for entry in fs::read_dir(backup_root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", backup_root.display(), e);
                continue;
            }
        };
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => children.push(entry.path()),
            Ok(_) => {}
            Err(e) => debug!("Skipping {}: {}", entry.path().display(), e),
        }
    }
    children.sort();

    Ok(children
        .into_iter()
        .filter_map(|path| {
            let stamp = path.file_name()?.to_str().and_then(BackupStamp::parse)?;
            Some(BackupEntry { path, stamp })
        })
        .collect())
}

/// `now` minus the retention window; saturates at the earliest representable time
pub fn cutoff(now: NaiveDateTime, retention_days: u32) -> NaiveDateTime {
    now.checked_sub_signed(Duration::days(i64::from(retention_days)))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Backups selected by one retention pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Folders older than the cutoff, deleted or (dry) reported
    pub selected: Vec<PathBuf>,
    /// Whether the selected folders were actually removed
    pub deleted: bool,
}

impl PruneReport {
    pub fn count(&self) -> usize {
        self.selected.len()
    }
}

/// Removes (or reports) backup folders older than the retention window
#[derive(Debug, Clone)]
pub struct RetentionPruner {
    backup_root: PathBuf,
    retention_days: u32,
    do_delete: bool,
    protected: Option<BackupStamp>,
}

impl RetentionPruner {
    pub fn new(backup_root: &Path, retention_days: u32) -> Self {
        Self {
            backup_root: backup_root.to_path_buf(),
            retention_days,
            do_delete: false,
            protected: None,
        }
    }

    /// Actually delete selected folders. Without this only a report is produced.
    pub fn with_delete(mut self, do_delete: bool) -> Self {
        self.do_delete = do_delete;
        self
    }

    /// Never select the folder of this run, whatever its age
    pub fn protect(mut self, stamp: BackupStamp) -> Self {
        self.protected = Some(stamp);
        self
    }

    /// Run one pass against the given local `now`
    pub fn prune_at(&self, now: NaiveDateTime) -> Result<PruneReport> {
        let cutoff = cutoff(now, self.retention_days);
        debug!("Retention cutoff: {}", cutoff);

        let mut report = PruneReport {
            selected: Vec::new(),
            deleted: self.do_delete,
        };

        for backup in list_backups(&self.backup_root)? {
            if Some(backup.stamp) == self.protected || backup.stamp.datetime() >= cutoff {
                continue;
            }

            if self.do_delete {
                remove_tree_best_effort(&backup.path);
                info!("Deleted old backup: {}", backup.path.display());
            } else {
                info!("(Dry) Would delete old backup: {}", backup.path.display());
            }
            report.selected.push(backup.path);
        }

        Ok(report)
    }

    pub fn prune(&self) -> Result<PruneReport> {
        self.prune_at(Local::now().naive_local())
    }
}

/// Remove old backups under `backup_root`, returning how many were selected
pub fn prune_old_backups(backup_root: &Path, retention_days: u32, do_delete: bool) -> Result<usize> {
    RetentionPruner::new(backup_root, retention_days)
        .with_delete(do_delete)
        .prune()
        .map(|report| report.count())
}

/// Delete a tree bottom-up, ignoring entries that cannot be removed.
/// Whatever residue remains stays on disk.
fn remove_tree_best_effort(root: &Path) {
    for entry in WalkDir::new(root)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Ignoring walk error during removal: {}", e);
                continue;
            }
        };

        let removed = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        if let Err(e) = removed {
            debug!("Ignoring removal error for {}: {}", entry.path().display(), e);
        }
    }
}
