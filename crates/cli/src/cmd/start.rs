//! Start the tt daemon

use anyhow::{Context, Result};
use cli_lib::config::Config;
use cli_lib::daemon;
use std::time::Duration;

pub async fn run(config: &Config, foreground: bool) -> Result<()> {
    if foreground {
        // Run daemon in foreground (for debugging)
        daemon::start(config).await
    } else {
        start_background(config).await
    }
}

async fn start_background(config: &Config) -> Result<()> {
    use std::process::Command;

    if daemon::is_running(config) {
        println!("Daemon already running");
        return Ok(());
    }

    let log_dir = config.data_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir).context("Failed to create logs directory")?;
    let log_file = log_dir.join("daemon.out");

    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    // Captures anything printed before the subscriber is up
    let log_file_writer = std::fs::File::create(&log_file).context("Failed to create log file")?;

    Command::new("nohup")
        .arg(&exe)
        .arg("start")
        .arg("--foreground")
        .stdout(log_file_writer.try_clone()?)
        .stderr(log_file_writer)
        .spawn()
        .context("Failed to spawn daemon process")?;

    // Wait for the lock and socket to appear
    let socket_path = config.socket_path()?;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if daemon::is_running(config) && socket_path.exists() {
            println!("Daemon started successfully");
            println!("Logs: {}", log_dir.display());
            return Ok(());
        }
    }

    anyhow::bail!("Daemon failed to start (check logs at {})", log_file.display());
}
