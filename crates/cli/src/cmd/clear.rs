//! Delete every tick and watch

use anyhow::{Context, Result};
use cli_lib::config::Config;
use cli_lib::ipc::Request;
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};

pub async fn run(config: &Config, yes: bool) -> Result<()> {
    if !yes && !confirm("Delete all recorded activity and watches?")? {
        println!("Cancelled");
        return Ok(());
    }

    let mut client = super::connect(config).await?;
    client.request(&Request::Clear).await?;

    println!("{}", "Cleared all ticks and watches".green());
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
