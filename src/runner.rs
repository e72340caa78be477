//! Orchestration of one backup run: discover, copy or skip, prune, report.

use crate::config::RunConfig;
use crate::copy::CopyExecutor;
use crate::discover::Discovery;
use crate::relpath::RelativePathResolver;
use crate::report::RunSummary;
use crate::retention::{BackupStamp, RetentionPruner};
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::{info, span, warn, Level};

/// Drives a single backup run and owns its counters
#[derive(Debug, Clone)]
pub struct BackupRunner {
    config: RunConfig,
}

impl BackupRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Destination tree of the run labelled `stamp`
    pub fn destination(&self, stamp: BackupStamp) -> PathBuf {
        self.config.backup_root.join(stamp.to_string())
    }

    /// Run now, in local time
    pub fn run(&self) -> RunSummary {
        self.run_at(Local::now().naive_local())
    }

    /// Run as if started at `started`. The same instant labels the destination
    /// folder and anchors the retention cutoff.
    pub fn run_at(&self, started: NaiveDateTime) -> RunSummary {
        let config = &self.config;
        let stamp = BackupStamp::from_datetime(started);
        let dest_root = self.destination(stamp);

        let span = span!(Level::INFO, "backup_run", stamp = %stamp);
        let _enter = span.enter();

        self.log_start(&dest_root);

        let mut summary = RunSummary::new(stamp, &dest_root, config.dry_run);

        if !config.dry_run {
            if let Err(e) = fs::create_dir_all(&dest_root) {
                warn!("Could not create destination {}: {}", dest_root.display(), e);
            }
        }

        let resolver = RelativePathResolver::new(&config.sources);
        let executor = CopyExecutor::new(config.dry_run).with_verify(config.verify);

        // The backup root may sit inside a source root; never walk into it
        let discovery = Discovery::new(&config.sources, &config.extensions, &config.excludes)
            .skip_trees([config.backup_root.clone(), dest_root.clone()]);
        for file in discovery {
            summary.discovered += 1;
            let dest = dest_root.join(resolver.relpath(&file.path));
            let outcome = executor.process(&file.path, &dest);
            summary.record(&file.path, outcome);
        }

        let pruner = RetentionPruner::new(&config.backup_root, config.retention_days)
            .with_delete(config.delete_enabled())
            .protect(stamp);
        match pruner.prune_at(started) {
            Ok(report) => summary.backups_pruned = report.count() as u64,
            Err(e) => warn!(
                "Retention pass over {} failed: {}",
                config.backup_root.display(),
                e
            ),
        }

        summary.log();

        if let Some(path) = config.summary_json.as_deref().filter(|_| !config.dry_run) {
            if let Err(e) = summary.write_json(path) {
                warn!("Could not write summary to {}: {}", path.display(), e);
            }
        }

        summary
    }

    fn log_start(&self, dest_root: &std::path::Path) {
        let config = &self.config;
        let sources: Vec<String> = config
            .sources
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let extensions: Vec<&str> = config.extensions.iter().collect();

        info!("=== Backup Run Start ===");
        info!("Sources: {}", sources.join(", "));
        info!("Backup root: {}", config.backup_root.display());
        info!("Destination (timestamped): {}", dest_root.display());
        info!("Extensions: {:?}", extensions);
        info!("Excludes: {:?}", config.excludes.patterns());
        info!("Retention days: {}", config.retention_days);
        info!(
            "Dry-run: {} | Delete-old: {} | Verify: {}",
            config.dry_run, config.delete_old, config.verify
        );
    }
}
