//! Core types for tt
//!
//! This crate provides:
//! - The persisted data model (watch rows, tick rows)
//! - The `Repository` seam implemented by the durable store
//! - An injectable `Clock`
//! - Watch path validation and nesting checks
//! - Tick-to-interval aggregation

pub mod clock;
pub mod error;
pub mod interval;
pub mod model;
pub mod path;
pub mod repo;

// Re-exports
pub use clock::{Clock, SystemClock, TestClock};
pub use error::{StoreError, ValidationError};
pub use interval::{collect_intervals, Interval, IntervalCollector, IntervalsResponse, Window};
pub use model::{TickRow, Timestamp, WatchInfo, WatchRow};
pub use repo::Repository;
