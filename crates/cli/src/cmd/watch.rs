//! Start tracking a directory

use anyhow::{Context, Result};
use cli_lib::config::Config;
use cli_lib::util;
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub async fn run(config: &Config, dir: Option<PathBuf>, label: Option<String>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let dir = util::resolve_dir(&dir)?;
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let mut client = super::connect(config).await?;
    match client.watch(&dir, label).await {
        Ok(info) => {
            println!(
                "Watching {} as {}",
                info.dir.display().to_string().cyan(),
                info.label.yellow()
            );
            Ok(())
        }
        Err(e) if e.kind() == Some("already_watched") => {
            println!("{}", e.to_string().dimmed());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
