//! Run counters, final summary and exit status.

use crate::copy::{CopyOutcome, TEMP_SUFFIX};
use crate::retention::BackupStamp;
use crate::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

/// Exit status of a run where every file was handled
pub const EXIT_SUCCESS: u8 = 0;

/// Exit status for unexpected failures (bad configuration, unusable log sink)
pub const EXIT_FAILURE: u8 = 1;

/// Exit status of a run where at least one copy failed
pub const EXIT_COPY_FAILURES: u8 = 2;

/// Aggregated outcome of one backup run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub stamp: Option<BackupStamp>,
    pub destination: PathBuf,
    pub dry_run: bool,
    pub discovered: u64,
    pub copied: u64,
    pub skipped: u64,
    /// Copies announced but not performed because of dry-run
    pub would_copy: u64,
    pub failed: u64,
    pub bytes_copied: u64,
    pub backups_pruned: u64,
}

impl RunSummary {
    pub fn new(stamp: BackupStamp, destination: &Path, dry_run: bool) -> Self {
        Self {
            stamp: Some(stamp),
            destination: destination.to_path_buf(),
            dry_run,
            ..Self::default()
        }
    }

    /// Fold one per-file outcome into the counters, logging failures
    pub fn record(&mut self, source: &Path, outcome: CopyOutcome) {
        match outcome {
            CopyOutcome::Copied { bytes } => {
                self.copied += 1;
                self.bytes_copied += bytes;
            }
            CopyOutcome::SkippedIdentical => self.skipped += 1,
            CopyOutcome::SkippedDryRun => self.would_copy += 1,
            CopyOutcome::Failed(e) => {
                self.failed += 1;
                error!("Failed to copy {}: {}", source.display(), e);
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Raw process status code for this run
    pub fn exit_status(&self) -> u8 {
        if self.has_failures() {
            EXIT_COPY_FAILURES
        } else {
            EXIT_SUCCESS
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// Emit the summary block and the end-of-run marker
    pub fn log(&self) {
        info!("=== Backup Run Summary ===");
        info!(
            discovered = self.discovered,
            copied = self.copied,
            skipped = self.skipped,
            failed = self.failed,
            "Discovered: {} | Copied: {} | Skipped: {} | Failed: {}",
            self.discovered,
            self.copied,
            self.skipped,
            self.failed
        );
        if self.dry_run {
            info!("Would copy (dry-run): {}", self.would_copy);
        }
        info!("Backups deleted: {}", self.backups_pruned);
        info!(
            "Total bytes copied: {} (~{:.2} MB)",
            self.bytes_copied,
            self.bytes_copied as f64 / (1024.0 * 1024.0)
        );
        info!("=== Backup Run End ===");
    }

    /// Write the summary as pretty JSON, atomically (temp file + rename)
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut temp_name = path.as_os_str().to_os_string();
        temp_name.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }
}
