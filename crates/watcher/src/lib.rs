//! Recursive directory watching for tt
//!
//! This crate turns Linux inotify notifications for a whole directory tree
//! into an ordered stream of create/delete/modify events:
//! - Watches are registered before a directory is scanned, so nothing
//!   created in between is missed
//! - Directories seen both by the scan and by the kernel are announced once
//! - VCS metadata and editor temp files are filtered out
//! - Raw inotify records are decoded explicitly from the read buffer

pub mod decode;
pub mod error;
pub mod event;
pub mod ignore;
mod sys;
pub mod watch;

// Re-exports
pub use error::WatchError;
pub use event::{Entry, WatchEvent};
pub use ignore::NameFilter;
pub use watch::{watch, WatchOptions};
