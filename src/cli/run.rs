//! Run command: one full backup pass.

use super::{SafetyArgs, TargetArgs};
use crate::config::Settings;
use crate::runner::BackupRunner;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;

/// Arguments for the run command
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// One or more source directories
    #[arg(long, num_args = 1..)]
    pub source_dirs: Vec<PathBuf>,

    /// Extensions to include (e.g. .txt .log csv)
    #[arg(long, num_args = 1..)]
    pub extensions: Vec<String>,

    /// Exclude patterns (substring match on path, name and components)
    #[arg(long, num_args = 0..)]
    pub exclude: Vec<String>,

    /// Compare SHA-256 digests of source and copy after each copy
    #[arg(long)]
    pub verify: bool,

    /// Write the run summary as JSON to this path (skipped in dry-run)
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub safety: SafetyArgs,
}

impl RunArgs {
    pub(super) fn apply(&self, settings: &mut Settings) {
        if !self.source_dirs.is_empty() {
            settings.source_dirs = self.source_dirs.clone();
        }
        if !self.extensions.is_empty() {
            settings.extensions = self.extensions.clone();
        }
        if !self.exclude.is_empty() {
            settings.exclude = self.exclude.clone();
        }
        if self.verify {
            settings.verify = true;
        }
        if let Some(path) = &self.summary_json {
            settings.summary_json = Some(path.clone());
        }
        self.target.apply(settings);
        self.safety.apply(settings);
    }
}

/// Run the backup and map its outcome to the process exit status
pub fn run(settings: &Settings) -> Result<ExitCode> {
    let config = settings
        .validate()
        .context("Invalid backup configuration")?;

    let summary = BackupRunner::new(config).run();
    Ok(summary.exit_code())
}
