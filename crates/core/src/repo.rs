//! Durable store seam
//!
//! The tracker only talks to storage through this trait. The sled-backed
//! implementation lives in the `journal` crate.
//!
//! Implementations are not required to serialize writers; callers hold a
//! single-writer lock around every mutating call.

use crate::error::StoreError;
use crate::model::{TickRow, Timestamp, WatchRow};
use std::path::Path;

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Repository: Send + Sync {
    /// Insert a tick; a tick already present at `time` is left untouched
    fn insert_tick_if_absent(&self, time: Timestamp, label: &str) -> StoreResult<()>;

    /// Set the last write time of the watch on `dir`
    ///
    /// Fails with `StoreError::UnknownWatch` if there is no such watch.
    fn update_last_write(&self, dir: &Path, time: Timestamp) -> StoreResult<()>;

    /// `insert_tick_if_absent` and `update_last_write` as one atomic write
    ///
    /// Either both take effect or neither does.
    fn record_activity(&self, dir: &Path, label: &str, time: Timestamp) -> StoreResult<()>;

    /// All desired watches, sorted by `dir` (byte order)
    fn list_watches(&self) -> StoreResult<Vec<WatchRow>>;

    /// Ticks with `start <= time <= end`, sorted by time
    fn list_ticks(&self, start: Timestamp, end: Timestamp) -> StoreResult<Vec<TickRow>>;

    /// Insert or replace the watch on `dir`, stamping its last write with `now`
    fn upsert_watch(&self, dir: &Path, label: &str, now: Timestamp) -> StoreResult<()>;

    /// Remove the watch on `dir`; returns whether a row was removed
    fn delete_watch(&self, dir: &Path) -> StoreResult<bool>;

    /// Delete the least recently written watches until at most `max` remain
    ///
    /// Returns the evicted rows, oldest first.
    fn evict_oldest_watches(&self, max: usize) -> StoreResult<Vec<WatchRow>>;

    /// Drop every tick and watch
    fn clear(&self) -> StoreResult<()>;

    /// Number of ticks stored
    fn tick_count(&self) -> StoreResult<usize>;
}
