//! Show daemon and watch status

use anyhow::Result;
use cli_lib::config::Config;
use cli_lib::ipc::IpcClient;
use cli_lib::locks::DaemonLock;
use cli_lib::util;
use owo_colors::OwoColorize;

pub async fn run(config: &Config) -> Result<()> {
    let data_dir = config.data_dir()?;
    let socket_path = config.socket_path()?;

    println!("{}", "Tracker Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Data dir:      {}", data_dir.display().to_string().cyan());

    print!("Daemon:        ");
    let Some(lock) = DaemonLock::probe(&data_dir)? else {
        println!("{}", "Not running".yellow());
        println!("  {}", "Tip: Start with 'tt start'".dimmed());
        return Ok(());
    };
    println!("{}", "Running ✓".green());

    let mut client = match IpcClient::connect(&socket_path).await {
        Ok(client) => client,
        Err(e) => {
            println!("  {}", format!("Not answering: {}", e).red());
            return Ok(());
        }
    };

    let status = client.status().await?;
    let now = util::now_unix();
    println!("  PID:         {}", status.pid);
    if lock.started_at > 0 {
        println!(
            "  Started:     {} ({})",
            util::format_relative_time(lock.started_at, now),
            util::format_absolute_time(lock.started_at).dimmed()
        );
    }
    println!("  Uptime:      {}", util::format_duration(status.uptime_secs as i64));
    println!();

    let tracker = status.tracker;
    println!(
        "Watches:       {} live / {} persisted (max {})",
        tracker.live_watches, tracker.desired_watches, tracker.max_watches
    );
    println!("Ticks:         {}", tracker.ticks);

    if tracker.live_watches < tracker.desired_watches {
        println!();
        println!(
            "{}",
            "Note: some watches are not live yet; they are retried every sync interval".dimmed()
        );
    }

    Ok(())
}
