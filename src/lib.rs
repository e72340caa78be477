//! # extsnap
//!
//! Extension-filtered file backups into timestamped folders, with age-based
//! pruning of earlier backups.
//!
//! ## Features
//!
//! - **Discovery**: lazy walk of one or more source roots, filtered by file
//!   extension and substring exclusion patterns (excluded directories are never descended)
//! - **Atomic copy**: temp file + rename, then source mtime and permissions applied
//! - **Idempotence**: files with unchanged size and mtime are skipped
//! - **Retention**: `YYYYMMDD_HHMMSS` folders older than the window are removed or reported
//! - **Dry-run by default**: nothing on disk changes unless explicitly requested
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use extsnap::{BackupRunner, Settings};
//! use std::path::PathBuf;
//!
//! # fn main() -> extsnap::Result<()> {
//! let settings = Settings {
//!     source_dirs: vec![PathBuf::from("/home/user/notes")],
//!     backup_dir: Some(PathBuf::from("/mnt/backups")),
//!     extensions: vec![".md".to_string(), ".txt".to_string()],
//!     dry_run: false,
//!     ..Settings::default()
//! };
//!
//! let summary = BackupRunner::new(settings.validate()?).run();
//! println!("Copied {} files", summary.copied);
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod cli;
pub mod config;
pub mod copy;
pub mod discover;
pub mod error;
pub mod exclude;
pub mod logging;
pub mod relpath;
pub mod report;
pub mod retention;
pub mod runner;

// Re-export commonly used types
pub use config::{RunConfig, Settings};
pub use copy::{AtomicCopy, CopyExecutor, CopyOutcome};
pub use discover::{DiscoveredFile, Discovery, ExtensionSet};
pub use error::{Error, Result};
pub use exclude::ExcludeMatcher;
pub use relpath::RelativePathResolver;
pub use report::RunSummary;
pub use retention::{prune_old_backups, BackupStamp, RetentionPruner};
pub use runner::BackupRunner;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
