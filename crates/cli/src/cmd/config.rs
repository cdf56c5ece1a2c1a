//! Configuration command
//!
//! Prints the effective configuration, defaults included.

use anyhow::{Context, Result};
use cli_lib::config::{self, Config};
use owo_colors::OwoColorize;

pub fn run(config: &Config, path_only: bool) -> Result<()> {
    let config_path =
        config::config_file_path().context("Could not determine config file path")?;

    if path_only {
        println!("{}", config_path.display());
        return Ok(());
    }

    println!("{}", "Configuration".bold());
    let source = if config_path.exists() {
        config_path.display().to_string()
    } else {
        format!("{} (not present, using defaults)", config_path.display())
    };
    println!("{}: {}", "Location".dimmed(), source.dimmed());
    println!("{}: {}", "Data dir".dimmed(), config.data_dir()?.display());
    println!("{}: {}\n", "Socket".dimmed(), config.socket_path()?.display());

    let text = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", text);

    println!("\n{}", "Valid Ranges:".bold());
    println!("  store_open_attempts: 1-20");
    println!("  max_watches: 1-64");
    println!("  sync_interval_secs, tick_flush_secs: 1-3600");
    println!("  quiet_period_secs: 0-3600");
    println!("  poll_interval_ms: 10-60,000");
    println!("  max_event_gap_secs: 60-86,400");

    Ok(())
}
