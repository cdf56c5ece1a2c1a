//! Stop the tt daemon

use anyhow::Result;
use cli_lib::config::Config;
use owo_colors::OwoColorize;

pub async fn run(config: &Config) -> Result<()> {
    if cli_lib::daemon::stop(config).await? {
        println!("{}", "Daemon stopped".green());
    } else {
        println!("{}", "Daemon is not running".yellow());
    }
    Ok(())
}
