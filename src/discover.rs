//! Lazy discovery of backup candidates under the configured source roots.
//!
//! Directories are checked against the exclusion patterns before they are
//! descended into, so an excluded subtree is never walked. A root nested in
//! (or repeating) another configured root is walked only once.

use crate::exclude::ExcludeMatcher;
use crate::relpath::canonical_or_given;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Normalized set of file extensions (`.txt`, `.log`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    /// Normalize and collect extensions. `TXT`, `.txt` and ` .Txt ` all become `.txt`.
    pub fn new<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for raw in extensions {
            let raw = raw.as_ref();
            let normalized = Self::normalize(raw)
                .ok_or_else(|| Error::config(format!("invalid extension: {raw:?}")))?;
            set.insert(normalized);
        }
        Ok(Self(set))
    }

    /// Lowercase and dot-prefix a single extension; `None` when nothing is left
    pub fn normalize(raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if bare.is_empty() {
            return None;
        }
        Some(format!(".{}", bare.to_lowercase()))
    }

    /// Test the last extension component of `path`, case-insensitively.
    ///
    /// Only the final suffix is considered: `a.tar.gz` is matched by `.gz`,
    /// never by `.tar.gz`.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .is_some_and(|ext| self.0.contains(&ext))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// A file selected for backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
}

/// Pull-based walk over every source root.
///
/// Reflects the filesystem at traversal time; once exhausted it cannot be
/// restarted.
pub struct Discovery<'a> {
    roots: std::vec::IntoIter<PathBuf>,
    /// Canonical trees never descended into
    skip_trees: Vec<PathBuf>,
    /// `skip_trees` as seen from the root being walked
    pruned: Vec<PathBuf>,
    current: Option<walkdir::IntoIter>,
    extensions: &'a ExtensionSet,
    excludes: &'a ExcludeMatcher,
}

impl<'a> Discovery<'a> {
    pub fn new(
        roots: &'a [PathBuf],
        extensions: &'a ExtensionSet,
        excludes: &'a ExcludeMatcher,
    ) -> Self {
        Self {
            roots: distinct_roots(roots).into_iter(),
            skip_trees: Vec::new(),
            pruned: Vec::new(),
            current: None,
            extensions,
            excludes,
        }
    }

    /// Never descend into these directories (the backup root, for one)
    pub fn skip_trees<I>(mut self, trees: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.skip_trees = trees.into_iter().map(|t| canonical_or_given(&t)).collect();
        self
    }

    /// Move on to the next existing root, warning about missing ones
    fn open_next_root(&mut self) -> Option<()> {
        loop {
            let root = self.roots.next()?;
            if !root.exists() {
                warn!("Source dir missing: {}", root.display());
                continue;
            }
            if !root.is_dir() {
                warn!("Source is not a directory: {}", root.display());
                continue;
            }

            let canonical_root = canonical_or_given(&root);
            self.pruned = self
                .skip_trees
                .iter()
                .filter_map(|tree| tree.strip_prefix(&canonical_root).ok())
                .filter(|rel| !rel.as_os_str().is_empty())
                .map(|rel| root.join(rel))
                .collect();

            debug!("Scanning source root: {}", root.display());
            self.current = Some(
                WalkDir::new(&root)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter(),
            );
            return Some(());
        }
    }
}

/// Drop roots that repeat an earlier root or sit inside another root, comparing
/// canonical forms. Order of the remaining roots is kept.
fn distinct_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    let canonical: Vec<PathBuf> = roots.iter().map(|r| canonical_or_given(r)).collect();
    let mut kept = Vec::new();

    for (i, root) in roots.iter().enumerate() {
        let this = &canonical[i];
        if canonical[..i].contains(this) {
            debug!("Ignoring repeated source root: {}", root.display());
            continue;
        }
        if canonical.iter().any(|other| other != this && this.starts_with(other)) {
            debug!("Ignoring source root nested in another: {}", root.display());
            continue;
        }
        kept.push(root.clone());
    }
    kept
}

impl Iterator for Discovery<'_> {
    type Item = DiscoveredFile;

    fn next(&mut self) -> Option<DiscoveredFile> {
        loop {
            if self.current.is_none() {
                self.open_next_root()?;
            }
            let Some(walker) = self.current.as_mut() else {
                continue;
            };

            let entry = match walker.next() {
                None => {
                    self.current = None;
                    continue;
                }
                Some(Err(e)) => {
                    warn!("Skipping entry due to error: {}", e);
                    continue;
                }
                Some(Ok(entry)) => entry,
            };

            if entry.file_type().is_dir() {
                if entry.depth() == 0 {
                    continue;
                }
                if self.excludes.is_excluded(entry.path()) {
                    debug!("Pruning excluded directory: {}", entry.path().display());
                    walker.skip_current_dir();
                } else if self.pruned.iter().any(|tree| tree == entry.path()) {
                    debug!("Not descending into backup tree: {}", entry.path().display());
                    walker.skip_current_dir();
                }
                continue;
            }

            // Symlinked directories are not followed. Any other link is treated
            // as a file; a dangling one then fails at copy time.
            if entry.path_is_symlink() && entry.path().is_dir() {
                continue;
            }

            let path = entry.into_path();
            if self.excludes.is_excluded(&path) {
                debug!("Excluded file: {}", path.display());
                continue;
            }
            if self.extensions.matches(&path) {
                return Some(DiscoveredFile { path });
            }
        }
    }
}
