//! Errors shared across crates

use std::path::PathBuf;
use thiserror::Error;

/// Malformed input rejected before it reaches the store
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("watch path must be absolute: {0:?}")]
    RelativePath(PathBuf),

    #[error("watch path may not contain '..': {0:?}")]
    ParentComponent(PathBuf),

    #[error("watch path is the filesystem root")]
    FilesystemRoot,

    #[error("tick label must not be empty (\"\" is reserved for the union of all ticks)")]
    EmptyLabel,

    #[error("invalid time range: start {start} is after end {end}")]
    InvertedRange { start: i64, end: i64 },
}

/// Failure reported by a `Repository` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write referenced a watch row that does not exist (e.g. it was evicted)
    #[error("no watch registered for {0:?}")]
    UnknownWatch(PathBuf),

    /// A stored record could not be decoded
    #[error("corrupt record in {tree}: {reason}")]
    Corrupt { tree: &'static str, reason: String },

    /// The underlying storage engine failed
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
