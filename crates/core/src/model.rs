//! Persisted rows and API views

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whole seconds since the Unix epoch
pub type Timestamp = i64;

/// A desired watch, as persisted in the store
///
/// Keyed by `dir`. No two rows' dirs nest inside one another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRow {
    /// Root of the watched tree (absolute)
    pub dir: PathBuf,
    /// Label recorded with every tick produced under `dir`
    pub label: String,
    /// Time of the most recent recorded activity under `dir`
    pub last_write: Timestamp,
}

/// A single recorded instant of activity
///
/// Keyed by `time`; a second tick at the same instant is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRow {
    pub time: Timestamp,
    pub label: String,
}

impl TickRow {
    pub fn new(time: Timestamp, label: impl Into<String>) -> Self {
        Self {
            time,
            label: label.into(),
        }
    }
}

/// A live watch as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchInfo {
    pub dir: PathBuf,
    pub label: String,
    /// Most recent write under `dir`, if the watch is still persisted
    pub last_write: Option<Timestamp>,
}
