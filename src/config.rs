//! Run configuration: raw settings from a TOML file and the command line,
//! and the validated form the runner consumes.

use crate::discover::ExtensionSet;
use crate::exclude::ExcludeMatcher;
use crate::retention::DEFAULT_RETENTION_DAYS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the durable log
pub const DEFAULT_LOG_PATH: &str = "/var/log/extsnap.log";

/// Unvalidated settings, as read from a settings file and overridden by flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub source_dirs: Vec<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub retention_days: u32,
    /// Preview only. On unless explicitly turned off.
    pub dry_run: bool,
    /// Remove expired backups. Has no effect while `dry_run` is on.
    pub delete_old: bool,
    pub exclude: Vec<String>,
    pub verify: bool,
    pub summary_json: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_dirs: Vec::new(),
            backup_dir: None,
            extensions: Vec::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
            dry_run: true,
            delete_old: false,
            exclude: Vec::new(),
            verify: false,
            summary_json: None,
            log_path: None,
            verbose: false,
        }
    }
}

impl Settings {
    /// Read settings from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
    }

    fn backup_root(&self) -> Result<PathBuf> {
        match &self.backup_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.clone()),
            _ => Err(Error::config("a backup directory is required")),
        }
    }

    /// Normalize and check everything a backup run needs
    pub fn validate(&self) -> Result<RunConfig> {
        if self.source_dirs.is_empty() {
            return Err(Error::config("at least one source directory is required"));
        }
        if self.extensions.is_empty() {
            return Err(Error::config("at least one extension is required"));
        }

        Ok(RunConfig {
            sources: self.source_dirs.iter().map(|p| absolutize(p)).collect(),
            backup_root: self.backup_root()?,
            extensions: ExtensionSet::new(&self.extensions)?,
            excludes: ExcludeMatcher::new(self.exclude.iter().cloned()),
            retention_days: self.retention_days,
            dry_run: self.dry_run,
            delete_old: self.delete_old,
            verify: self.verify,
            summary_json: self.summary_json.clone(),
        })
    }

    /// Only what a standalone retention pass needs
    pub fn validate_prune(&self) -> Result<PruneConfig> {
        Ok(PruneConfig {
            backup_root: self.backup_root()?,
            retention_days: self.retention_days,
            do_delete: self.delete_old && !self.dry_run,
        })
    }
}

/// Validated configuration of one backup run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Absolute source roots, in configuration order
    pub sources: Vec<PathBuf>,
    pub backup_root: PathBuf,
    pub extensions: ExtensionSet,
    pub excludes: ExcludeMatcher,
    pub retention_days: u32,
    pub dry_run: bool,
    pub delete_old: bool,
    pub verify: bool,
    pub summary_json: Option<PathBuf>,
}

impl RunConfig {
    /// Deletion needs both the flag and a real run; dry-run always wins
    pub fn delete_enabled(&self) -> bool {
        self.delete_old && !self.dry_run
    }
}

/// Validated configuration of a retention-only pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneConfig {
    pub backup_root: PathBuf,
    pub retention_days: u32,
    pub do_delete: bool,
}

/// Canonical path when it exists, otherwise joined onto the working directory
fn absolutize(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
