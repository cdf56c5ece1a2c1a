//! List live watches

use anyhow::Result;
use cli_lib::config::Config;
use cli_lib::util;
use owo_colors::OwoColorize;

pub async fn run(config: &Config) -> Result<()> {
    let mut client = super::connect(config).await?;
    let watches = client.watches().await?;

    if watches.is_empty() {
        println!("{}", "No watches".dimmed());
        println!("  {}", "Tip: Add one with 'tt watch <dir>'".dimmed());
        return Ok(());
    }

    let now = util::now_unix();
    let width = watches.iter().map(|w| w.label.len()).max().unwrap_or(0);
    for watch in &watches {
        let last = match watch.last_write {
            Some(ts) => util::format_relative_time(ts, now),
            None => "unknown".to_string(),
        };
        println!(
            "{:width$}  {}  {}",
            watch.label.yellow(),
            watch.dir.display().to_string().cyan(),
            last.dimmed(),
            width = width
        );
    }

    Ok(())
}
