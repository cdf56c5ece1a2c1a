//! Events delivered to watch callbacks

use std::fmt;
use std::path::{Path, PathBuf};

/// The filesystem entry an event refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            is_dir,
        }
    }
}

/// A change under the watched tree
///
/// Renames into the tree are reported as `Create`, renames out of it as
/// `Delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Create(Entry),
    Delete(Entry),
    Modify(Entry),
}

impl WatchEvent {
    pub fn entry(&self) -> &Entry {
        match self {
            WatchEvent::Create(entry) | WatchEvent::Delete(entry) | WatchEvent::Modify(entry) => {
                entry
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.entry().path
    }

    pub fn is_dir(&self) -> bool {
        self.entry().is_dir
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            WatchEvent::Create(_) => "Create",
            WatchEvent::Delete(_) => "Delete",
            WatchEvent::Modify(_) => "Modify",
        };
        let slash = if self.is_dir() { "/" } else { "" };
        write!(f, "{} \"{}{}\"", verb, self.path().display(), slash)
    }
}
