//! Record activity by hand

use anyhow::Result;
use cli_lib::config::Config;
use cli_lib::ipc::{Request, TickAck};
use cli_lib::util;
use owo_colors::OwoColorize;

pub async fn run(config: &Config, label: &str) -> Result<()> {
    let mut client = super::connect(config).await?;
    let ack: TickAck = client
        .call(&Request::Tick {
            label: label.to_string(),
        })
        .await?;

    println!(
        "Recorded {} at {}",
        label.yellow(),
        util::format_absolute_time(ack.time)
    );
    Ok(())
}
