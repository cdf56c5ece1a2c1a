//! Filtering of uninteresting entries
//!
//! Two sources of patterns:
//! 1. Built-in names (VCS metadata and editor temp files, always active)
//! 2. Config patterns in gitignore syntax, anchored at the watch root

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Names that mark version-control metadata
const VCS_MARKERS: &[&str] = &[".git", ".hg", ".svn", ".jj"];

/// Decides which entries under a watch root are skipped
#[derive(Clone, Default)]
pub struct NameFilter {
    patterns: Option<Gitignore>,
}

impl NameFilter {
    /// Built-in rules only
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Built-in rules plus gitignore-style `patterns` relative to `root`
    pub fn with_patterns(root: &Path, patterns: &[String]) -> Result<Self, ignore::Error> {
        if patterns.is_empty() {
            return Ok(Self::builtin());
        }

        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder.add_line(None, pattern)?;
        }
        Ok(Self {
            patterns: Some(builder.build()?),
        })
    }

    /// Check if the entry at `path` should be skipped
    ///
    /// Only the final component is checked against the built-in names;
    /// callers never descend into a skipped directory.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();

        if is_vcs_metadata(&name) || is_editor_temp(&name) {
            return true;
        }

        match &self.patterns {
            Some(patterns) => patterns.matched(path, is_dir).is_ignore(),
            None => false,
        }
    }
}

fn is_vcs_metadata(name: &str) -> bool {
    VCS_MARKERS.iter().any(|marker| name.contains(marker))
}

fn is_editor_temp(name: &str) -> bool {
    // Vim swap files and its write probe
    if name.ends_with(".swp")
        || name.ends_with(".swo")
        || name.ends_with(".swx")
        || name == "4913"
    {
        return true;
    }

    // Backup files
    if name.ends_with('~') {
        return true;
    }

    // Emacs auto-save and lock files
    (name.len() > 1 && name.starts_with('#') && name.ends_with('#')) || name.starts_with(".#")
}
