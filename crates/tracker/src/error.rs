//! Tracker error type

use std::path::PathBuf;
use thiserror::Error;
use tt_core::{StoreError, ValidationError};

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The requested dir equals, contains, or is inside an existing watch
    #[error("{dir:?} overlaps the existing watch on {existing:?}")]
    AlreadyWatched { dir: PathBuf, existing: PathBuf },

    #[error("not watching {0:?}")]
    NotWatched(PathBuf),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reconciliation kept failing; the daemon should exit
    #[error("watch synchronization failed {failures} times in a row")]
    SyncFailed {
        failures: u32,
        #[source]
        last: Box<TrackerError>,
    },
}

impl TrackerError {
    /// Stable machine-readable name, used on the IPC wire
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::AlreadyWatched { .. } => "already_watched",
            TrackerError::NotWatched(_) => "not_watched",
            TrackerError::Validation(_) => "invalid_request",
            TrackerError::Store(_) => "store",
            TrackerError::SyncFailed { .. } => "sync_failed",
        }
    }
}
