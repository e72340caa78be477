//! List command: show the backup runs recorded under the backup root.

use super::TargetArgs;
use crate::config::Settings;
use crate::retention::{cutoff, list_backups, BackupEntry};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Args;
use serde::Serialize;
use std::process::ExitCode;

/// Output format for listings
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Arguments for the list command
#[derive(Args, Debug, Default, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl ListArgs {
    pub(super) fn apply(&self, settings: &mut Settings) {
        self.target.apply(settings);
    }
}

/// One listed backup with its age relative to now
#[derive(Debug, Serialize)]
pub struct ListedBackup {
    #[serde(flatten)]
    pub entry: BackupEntry,
    pub age_days: i64,
    pub expired: bool,
}

/// Annotate backups with their age and whether they fall outside the window
pub fn annotate(
    backups: Vec<BackupEntry>,
    now: NaiveDateTime,
    retention_days: u32,
) -> Vec<ListedBackup> {
    let cutoff = cutoff(now, retention_days);
    backups
        .into_iter()
        .map(|entry| ListedBackup {
            age_days: (now - entry.stamp.datetime()).num_days(),
            expired: entry.stamp.datetime() < cutoff,
            entry,
        })
        .collect()
}

/// Run the list command
pub fn run(settings: &Settings, format: OutputFormat) -> Result<ExitCode> {
    let config = settings
        .validate_prune()
        .context("Invalid list configuration")?;

    let backups = list_backups(&config.backup_root)
        .with_context(|| format!("Failed to scan {}", config.backup_root.display()))?;
    let listed = annotate(backups, Local::now().naive_local(), config.retention_days);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&listed)?);
        }
        OutputFormat::Table => {
            if listed.is_empty() {
                println!("No backups found in {}", config.backup_root.display());
                return Ok(ExitCode::SUCCESS);
            }

            println!("{:<17} {:>8}  {:<8} PATH", "STAMP", "AGE (d)", "STATUS");
            for backup in &listed {
                println!(
                    "{:<17} {:>8}  {:<8} {}",
                    backup.entry.stamp,
                    backup.age_days,
                    if backup.expired { "expired" } else { "kept" },
                    backup.entry.path.display()
                );
            }
            println!(
                "\n{} backups, {} outside the {}-day window",
                listed.len(),
                listed.iter().filter(|b| b.expired).count(),
                config.retention_days
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::BackupStamp;
    use std::path::PathBuf;

    #[test]
    fn test_annotate_marks_expired() {
        let entries: Vec<BackupEntry> = ["20200101_000000", "20200225_000000"]
            .into_iter()
            .map(|name| BackupEntry {
                path: PathBuf::from("/b").join(name),
                stamp: BackupStamp::parse(name).unwrap(),
            })
            .collect();
        let now = BackupStamp::parse("20200301_000000").unwrap().datetime();

        let listed = annotate(entries, now, 30);
        assert_eq!(listed[0].age_days, 60);
        assert!(listed[0].expired);
        assert_eq!(listed[1].age_days, 5);
        assert!(!listed[1].expired);
    }
}
