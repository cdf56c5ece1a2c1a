//! Durable tick and watch storage
//!
//! This crate provides:
//! - `Journal`, the sled-backed `Repository` implementation
//! - Order-preserving key encodings for ticks and watch dirs
//!
//! Layout (one sled db, two trees):
//! ```text
//! ticks:   time (sign-flipped big-endian i64) -> label
//! watches: dir (raw path bytes)               -> WatchRecord (bincode)
//! ```

pub mod codec;
pub mod error;
pub mod journal;

// Re-exports
pub use error::JournalError;
pub use journal::Journal;

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, JournalError>;
