//! Command-line interface for extsnap.
//!
//! Flags override values from an optional TOML settings file, which in turn
//! override the built-in defaults.

use crate::config::Settings;
use crate::logging::{LogFormat, LogSinks};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

pub mod list;
pub mod prune;
pub mod run;

/// extsnap - extension-filtered, timestamped backups with retention cleanup
#[derive(Parser, Debug)]
#[command(name = "extsnap")]
#[command(about = "Back up files by extension into timestamped folders and prune old backups")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, env = "EXTSNAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path of the log file [default: /var/log/extsnap.log]
    #[arg(long, global = true)]
    pub log_path: Option<PathBuf>,

    /// Console log format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Write per-file detail to the log file
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up matching files, then apply the retention window
    Run(run::RunArgs),
    /// Apply the retention window without copying anything
    Prune(prune::PruneArgs),
    /// List backup folders found under the backup root
    List(list::ListArgs),
}

/// Where backups live and how long they are kept
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// Backup root directory
    #[arg(long, env = "EXTSNAP_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Retention window for old backups, in days [default: 30]
    #[arg(long)]
    pub retention_days: Option<u32>,
}

impl TargetArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.backup_dir {
            settings.backup_dir = Some(dir.clone());
        }
        if let Some(days) = self.retention_days {
            settings.retention_days = days;
        }
    }
}

/// Switches guarding every filesystem mutation
#[derive(Args, Debug, Default, Clone)]
pub struct SafetyArgs {
    /// Preview actions without performing them (the default)
    #[arg(long, conflicts_with = "execute")]
    pub dry_run: bool,

    /// Perform copies and deletions instead of previewing them
    #[arg(long)]
    pub execute: bool,

    /// Delete backups older than the retention window (only with --execute)
    #[arg(long)]
    pub delete_old: bool,
}

impl SafetyArgs {
    fn apply(&self, settings: &mut Settings) {
        if self.dry_run {
            settings.dry_run = true;
        } else if self.execute {
            settings.dry_run = false;
        }
        if self.delete_old {
            settings.delete_old = true;
        }
    }
}

impl Cli {
    /// Settings file (if any) with the global flags applied
    fn base_settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::default(),
        };

        if let Some(path) = &self.log_path {
            settings.log_path = Some(path.clone());
        }
        if self.verbose {
            settings.verbose = true;
        }
        Ok(settings)
    }

    fn open_sinks(&self, settings: &Settings, with_file: bool) -> Result<LogSinks> {
        let log_path = settings.log_path();
        let file = with_file.then_some(log_path.as_path());
        LogSinks::open(file, settings.verbose, self.log_format)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))
    }
}

/// Parse-independent entry point: resolve settings, open the sinks and run
/// the selected command inside them.
pub fn execute(cli: Cli) -> Result<ExitCode> {
    let mut settings = cli.base_settings()?;

    match &cli.command {
        Commands::Run(args) => {
            args.apply(&mut settings);
            let sinks = cli.open_sinks(&settings, true)?;
            sinks.in_scope(|| run::run(&settings))
        }
        Commands::Prune(args) => {
            args.apply(&mut settings);
            let sinks = cli.open_sinks(&settings, true)?;
            sinks.in_scope(|| prune::run(&settings))
        }
        Commands::List(args) => {
            args.apply(&mut settings);
            let sinks = cli.open_sinks(&settings, false)?;
            sinks.in_scope(|| list::run(&settings, args.format))
        }
    }
}
