//! Placement of discovered files under the destination tree.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maps absolute files to paths relative to the source root containing them.
#[derive(Debug, Clone)]
pub struct RelativePathResolver {
    /// Canonical forms of the configured roots, in configuration order
    roots: Vec<PathBuf>,
}

impl RelativePathResolver {
    /// Canonicalize each root once. Roots that cannot be canonicalized (missing)
    /// keep their given form; they never contain discovered files anyway.
    pub fn new(roots: &[PathBuf]) -> Self {
        Self {
            roots: roots.iter().map(|r| canonical_or_given(r)).collect(),
        }
    }

    /// Path of `file` relative to the first root that is an ancestor of it.
    ///
    /// When no root contains the canonical file (a symlink pointing outside
    /// every root, for example) only the file name is kept. Unrelated files
    /// with the same name can then land on the same destination path.
    pub fn relpath(&self, file: &Path) -> PathBuf {
        let resolved = canonical_or_given(file);

        for root in &self.roots {
            if let Ok(rel) = resolved.strip_prefix(root) {
                if !rel.as_os_str().is_empty() {
                    return rel.to_path_buf();
                }
            }
        }

        debug!(
            "No source root contains {}, falling back to file name",
            resolved.display()
        );
        resolved
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(resolved.as_os_str()))
    }
}

pub(crate) fn canonical_or_given(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
