//! CLI command implementations

pub mod clear;
pub mod config;
pub mod intervals;
pub mod start;
pub mod status;
pub mod stop;
pub mod tick;
pub mod unwatch;
pub mod watch;
pub mod watches;

use anyhow::{Context, Result};
use cli_lib::config::Config;
use cli_lib::ipc::IpcClient;

/// Connect to the running daemon, with a hint if there is none
pub(crate) async fn connect(config: &Config) -> Result<IpcClient> {
    let socket_path = config.socket_path()?;
    IpcClient::connect(&socket_path)
        .await
        .context("Is the daemon running? Start it with 'tt start'")
}
