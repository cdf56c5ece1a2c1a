//! tt CLI library
//!
//! Exposes the daemon, IPC, and config modules so integration tests can
//! drive them without spawning the binary.

pub mod config;
pub mod daemon;
pub mod ipc;
pub mod locks;
pub mod util;
