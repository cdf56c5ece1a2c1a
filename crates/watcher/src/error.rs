//! Watcher error type

use crate::decode::DecodeError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// The root of the watched tree was deleted (or unmounted)
    #[error("watch root {0:?} has been deleted")]
    RootDeleted(PathBuf),

    #[error("watch root {0:?} is not a directory")]
    NotADirectory(PathBuf),

    /// The kernel event queue overflowed and events were lost
    #[error("inotify event queue overflowed")]
    Overflow,

    #[error("{op} failed for {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid ignore pattern: {0}")]
    Pattern(#[from] ignore::Error),

    #[error("malformed inotify record: {0}")]
    Decode(#[from] DecodeError),

    /// Error returned by the event callback
    #[error(transparent)]
    Callback(anyhow::Error),
}

impl WatchError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        WatchError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// True if `err` means the path disappeared (or was replaced by a
/// non-directory) while we were looking at it
pub(crate) fn is_vanished(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || err.raw_os_error() == Some(libc::ENOTDIR)
}
