//! Prune command: retention pass on its own.

use super::{SafetyArgs, TargetArgs};
use crate::config::Settings;
use crate::retention::RetentionPruner;
use anyhow::{Context, Result};
use clap::Args;
use std::process::ExitCode;
use tracing::info;

/// Arguments for the prune command
#[derive(Args, Debug, Default, Clone)]
pub struct PruneArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub safety: SafetyArgs,
}

impl PruneArgs {
    pub(super) fn apply(&self, settings: &mut Settings) {
        self.target.apply(settings);
        self.safety.apply(settings);
    }
}

/// Run the prune command
pub fn run(settings: &Settings) -> Result<ExitCode> {
    let config = settings
        .validate_prune()
        .context("Invalid prune configuration")?;

    info!("=== Retention Pass Start ===");
    info!("Backup root: {}", config.backup_root.display());
    info!(
        "Retention days: {} | Delete: {}",
        config.retention_days, config.do_delete
    );

    let report = RetentionPruner::new(&config.backup_root, config.retention_days)
        .with_delete(config.do_delete)
        .prune()
        .with_context(|| format!("Failed to scan {}", config.backup_root.display()))?;

    if report.deleted {
        info!("Backups deleted: {}", report.count());
    } else {
        info!("Backups that would be deleted: {}", report.count());
    }
    info!("=== Retention Pass End ===");

    Ok(ExitCode::SUCCESS)
}
