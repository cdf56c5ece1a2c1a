//! Watch lifecycle and tick recording for tt
//!
//! A `Tracker` owns the bridge between the durable store and the live
//! filesystem watches:
//! - `sync_watches` evicts watches over capacity, then converges the live
//!   watch set to the persisted one
//! - every live watch runs a recursive watcher on its own thread and a tick
//!   recorder task that turns bursts of writes into at most one tick per
//!   flush interval
//! - intervals are computed on demand from the stored ticks

mod api;
pub mod error;
mod recorder;
pub mod settings;
mod state;
mod sync;

// Re-exports
pub use api::{Tracker, TrackerStatus};
pub use error::{Result, TrackerError};
pub use settings::TrackerSettings;
pub use sync::SyncReport;
