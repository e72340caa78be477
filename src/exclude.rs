//! Substring-based exclusion of files and directories.

use std::borrow::Cow;
use std::path::Path;

/// Decides whether a path is excluded from a backup run.
///
/// A path is excluded when any pattern is a substring of the full path string,
/// of its final component, or of any single path component. Patterns are
/// matched literally; there is no glob or regex syntax.
#[derive(Debug, Clone, Default)]
pub struct ExcludeMatcher {
    patterns: Vec<String>,
}

impl ExcludeMatcher {
    /// Build a matcher, dropping empty patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check a path against every pattern
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let candidates = candidate_strings(path);
        self.patterns
            .iter()
            .any(|pattern| candidates.iter().any(|c| c.contains(pattern.as_str())))
    }
}

/// Full path, file name and every component, as lossy strings
fn candidate_strings(path: &Path) -> Vec<Cow<'_, str>> {
    let mut candidates = vec![path.to_string_lossy()];
    if let Some(name) = path.file_name() {
        candidates.push(name.to_string_lossy());
    }
    candidates.extend(path.components().map(|c| c.as_os_str().to_string_lossy()));
    candidates
}
