//! Per-file copy decisions and the atomic, metadata-preserving copy.
//!
//! A copy is staged into a temporary file next to the destination and then
//! renamed over it, so the destination path only ever holds the previous
//! complete version or the new complete version.

use crate::checksum::sha256_file;
use crate::error::CopyStage;
use crate::{Error, Result};
use std::fs::{self, File, FileTimes, Metadata, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info, span, Level};

/// Marker carried by in-progress copies (`name.<random>.tmp_copy`)
pub const TEMP_SUFFIX: &str = ".tmp_copy";

/// Result of processing one discovered file
#[derive(Debug)]
pub enum CopyOutcome {
    Copied { bytes: u64 },
    SkippedIdentical,
    SkippedDryRun,
    Failed(Error),
}

/// Decides skip-vs-copy for each file and performs the copy
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyExecutor {
    dry_run: bool,
    verify: bool,
}

impl CopyExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            verify: false,
        }
    }

    /// Compare SHA-256 digests of source and destination after each copy
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Process a single file. Errors are captured in the outcome, never returned.
    pub fn process(&self, source: &Path, dest: &Path) -> CopyOutcome {
        let span = span!(Level::DEBUG, "copy", path = %source.display());
        let _enter = span.enter();

        if self.dry_run {
            info!("(Dry) Would copy: {} -> {}", source.display(), dest.display());
            return CopyOutcome::SkippedDryRun;
        }

        match self.copy_if_changed(source, dest) {
            Ok(outcome) => outcome,
            Err(e) => CopyOutcome::Failed(e),
        }
    }

    fn copy_if_changed(&self, source: &Path, dest: &Path) -> Result<CopyOutcome> {
        if files_equal(source, dest) {
            debug!("Skip (same size+mtime): {}", source.display());
            return Ok(CopyOutcome::SkippedIdentical);
        }

        let bytes = AtomicCopy::stage(source, dest)?.commit()?;
        if self.verify {
            verify_copy(source, dest)?;
        }

        debug!("Copied: {} -> {} ({} bytes)", source.display(), dest.display(), bytes);
        Ok(CopyOutcome::Copied { bytes })
    }
}

/// Size plus whole-second modification time equality.
///
/// This is a heuristic, not a content comparison: two different files with
/// the same size and truncated mtime are treated as identical.
pub fn files_equal(source: &Path, dest: &Path) -> bool {
    let (Ok(src), Ok(dst)) = (fs::metadata(source), fs::metadata(dest)) else {
        return false;
    };

    dst.is_file()
        && src.len() == dst.len()
        && matches!(
            (mtime_secs(&src), mtime_secs(&dst)),
            (Some(a), Some(b)) if a == b
        )
}

/// Modification time in whole seconds, truncated toward zero
fn mtime_secs(meta: &Metadata) -> Option<i64> {
    let modified = meta.modified().ok()?;
    let secs = match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    };
    Some(secs)
}

/// A copy written to a temporary sibling of its destination, not yet visible.
///
/// Dropping an uncommitted stage removes the temporary file.
#[derive(Debug)]
pub struct AtomicCopy {
    staged: NamedTempFile,
    dest: PathBuf,
    source_meta: Metadata,
    bytes: u64,
}

impl AtomicCopy {
    /// Create parent directories and write the full source content to a temp file
    pub fn stage(source: &Path, dest: &Path) -> Result<Self> {
        let (parent, name) = match (dest.parent(), dest.file_name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => {
                return Err(Error::file_io(
                    CopyStage::Open,
                    dest,
                    io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
                ))
            }
        };

        let source_meta =
            fs::metadata(source).map_err(|e| Error::file_io(CopyStage::Stat, source, e))?;
        let mut reader = File::open(source).map_err(|e| Error::file_io(CopyStage::Open, source, e))?;

        fs::create_dir_all(parent).map_err(|e| Error::file_io(CopyStage::CreateDir, parent, e))?;

        let mut prefix = name.to_os_string();
        prefix.push(".");
        let mut staged = Builder::new()
            .prefix(&prefix)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| Error::file_io(CopyStage::Open, dest, e))?;

        let bytes = io::copy(&mut reader, staged.as_file_mut())
            .map_err(|e| Error::file_io(CopyStage::Write, dest, e))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|e| Error::file_io(CopyStage::Write, dest, e))?;

        Ok(Self {
            staged,
            dest: dest.to_path_buf(),
            source_meta,
            bytes,
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.staged.path()
    }

    /// Rename the staged file onto the destination, then copy source metadata.
    /// Returns the number of bytes copied.
    pub fn commit(self) -> Result<u64> {
        let Self {
            staged,
            dest,
            source_meta,
            bytes,
        } = self;

        staged
            .persist(&dest)
            .map_err(|e| Error::file_io(CopyStage::Rename, &dest, e.error))?;
        copy_metadata(&source_meta, &dest)
            .map_err(|e| Error::file_io(CopyStage::Metadata, &dest, e))?;

        Ok(bytes)
    }
}

/// Apply the source's timestamps and permission bits to `dest`.
///
/// Times go first: a read-only source mode would otherwise block opening
/// the destination for writing.
fn copy_metadata(source_meta: &Metadata, dest: &Path) -> io::Result<()> {
    let mut times = FileTimes::new().set_modified(source_meta.modified()?);
    if let Ok(accessed) = source_meta.accessed() {
        times = times.set_accessed(accessed);
    }

    OpenOptions::new().write(true).open(dest)?.set_times(times)?;
    fs::set_permissions(dest, source_meta.permissions())
}

fn verify_copy(source: &Path, dest: &Path) -> Result<()> {
    let digest = |path: &Path| {
        sha256_file(path).map_err(|e| Error::file_io(CopyStage::Verify, path, e))
    };
    let source_digest = digest(source)?;
    let dest_digest = digest(dest)?;
    if source_digest != dest_digest {
        return Err(Error::ChecksumMismatch {
            path: dest.to_path_buf(),
            source_digest,
            dest_digest,
        });
    }
    debug!("Verified {} ({})", dest.display(), source_digest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .open(path)?
            .set_times(FileTimes::new().set_modified(time))
    }

    fn leftover_temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().ends_with(TEMP_SUFFIX))
            .collect()
    }

    #[test]
    fn test_copy_creates_parents_and_preserves_mtime() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        fs::write(&source, b"hello")?;
        let pinned = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&source, pinned)?;

        let dest = temp_dir.path().join("backup/nested/dir/a.txt");
        let outcome = CopyExecutor::new(false).process(&source, &dest);

        assert!(matches!(outcome, CopyOutcome::Copied { bytes: 5 }));
        assert_eq!(fs::read(&dest)?, b"hello");
        assert_eq!(fs::metadata(&dest)?.modified()?, pinned);
        assert!(leftover_temp_files(dest.parent().unwrap()).is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_permissions() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("script.log");
        fs::write(&source, b"#!/bin/sh")?;
        fs::set_permissions(&source, fs::Permissions::from_mode(0o444))?;

        let dest = temp_dir.path().join("out/script.log");
        let outcome = CopyExecutor::new(false).process(&source, &dest);

        assert!(matches!(outcome, CopyOutcome::Copied { .. }));
        assert_eq!(fs::metadata(&dest)?.permissions().mode() & 0o777, 0o444);
        Ok(())
    }

    #[test]
    fn test_identical_file_is_skipped() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        let dest = temp_dir.path().join("out/a.txt");
        fs::write(&source, b"same")?;

        let executor = CopyExecutor::new(false);
        assert!(matches!(executor.process(&source, &dest), CopyOutcome::Copied { .. }));
        assert!(matches!(executor.process(&source, &dest), CopyOutcome::SkippedIdentical));
        Ok(())
    }

    #[test]
    fn test_size_and_mtime_heuristic_accepts_same_shape() -> Result<()> {
        // Different content, same size and mtime: treated as identical
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        let dest = temp_dir.path().join("b.txt");
        fs::write(&source, b"aaaa")?;
        fs::write(&dest, b"bbbb")?;
        let pinned = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&source, pinned)?;
        set_mtime(&dest, pinned + Duration::from_millis(400))?;

        assert!(files_equal(&source, &dest));

        set_mtime(&dest, pinned + Duration::from_secs(1))?;
        assert!(!files_equal(&source, &dest));
        Ok(())
    }

    #[test]
    fn test_changed_file_is_recopied() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        let dest = temp_dir.path().join("out/a.txt");
        fs::write(&source, b"v1")?;

        let executor = CopyExecutor::new(false);
        executor.process(&source, &dest);

        fs::write(&source, b"version two")?;
        let outcome = executor.process(&source, &dest);
        assert!(matches!(outcome, CopyOutcome::Copied { bytes: 11 }));
        assert_eq!(fs::read(&dest)?, b"version two");
        Ok(())
    }

    #[test]
    fn test_dry_run_touches_nothing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        fs::write(&source, b"data")?;
        let dest = temp_dir.path().join("out/a.txt");

        let outcome = CopyExecutor::new(true).process(&source, &dest);
        assert!(matches!(outcome, CopyOutcome::SkippedDryRun));
        assert!(!temp_dir.path().join("out").exists());
        Ok(())
    }

    #[test]
    fn test_interrupted_stage_leaves_destination_intact() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        let dest = temp_dir.path().join("a.backup.txt");
        fs::write(&dest, b"old complete version")?;
        fs::write(&source, b"new complete version, longer")?;

        let stage = AtomicCopy::stage(&source, &dest)?;
        let temp_path = stage.temp_path().to_path_buf();
        assert!(temp_path.to_string_lossy().ends_with(TEMP_SUFFIX));
        assert!(temp_path.exists());
        // Between write and rename the destination still holds the old version
        assert_eq!(fs::read(&dest)?, b"old complete version");

        // Interruption before the rename
        drop(stage);
        assert_eq!(fs::read(&dest)?, b"old complete version");
        assert!(!temp_path.exists());

        let bytes = AtomicCopy::stage(&source, &dest)?.commit()?;
        assert_eq!(bytes, 28);
        assert_eq!(fs::read(&dest)?, b"new complete version, longer");
        Ok(())
    }

    #[test]
    fn test_missing_source_fails_without_panic() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("vanished.txt");
        let dest = temp_dir.path().join("out/vanished.txt");

        match CopyExecutor::new(false).process(&source, &dest) {
            CopyOutcome::Failed(Error::FileIo { stage, .. }) => assert_eq!(stage, CopyStage::Stat),
            other => panic!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_rename_onto_directory_fails() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        fs::write(&source, b"data")?;
        let dest = temp_dir.path().join("out/a.txt");
        fs::create_dir_all(dest.join("occupied"))?;

        let outcome = CopyExecutor::new(false).process(&source, &dest);
        assert!(matches!(
            outcome,
            CopyOutcome::Failed(Error::FileIo {
                stage: CopyStage::Rename,
                ..
            })
        ));
        assert!(leftover_temp_files(&temp_dir.path().join("out")).is_empty());
        Ok(())
    }

    #[test]
    fn test_verify_mode_accepts_good_copy() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        fs::write(&source, b"verify me")?;
        let dest = temp_dir.path().join("out/a.txt");

        let outcome = CopyExecutor::new(false).with_verify(true).process(&source, &dest);
        assert!(matches!(outcome, CopyOutcome::Copied { bytes: 9 }));
        Ok(())
    }

    #[test]
    fn test_verify_detects_different_content() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        let dest = temp_dir.path().join("b.txt");
        fs::write(&source, b"original")?;
        fs::write(&dest, b"tampered")?;

        let err = verify_copy(&source, &dest).unwrap_err();
        match err {
            Error::ChecksumMismatch {
                path,
                source_digest,
                dest_digest,
            } => {
                assert_eq!(path, dest);
                assert_ne!(source_digest, dest_digest);
            }
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_verify_reports_unreadable_file_with_stage() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.txt");
        let dest = temp_dir.path().join("missing.txt");
        fs::write(&source, b"original")?;

        let err = verify_copy(&source, &dest).unwrap_err();
        assert!(matches!(
            &err,
            Error::FileIo { stage: CopyStage::Verify, path, .. } if *path == dest
        ));
        assert!(err.to_string().starts_with("verify failed for"));
        Ok(())
    }
}
