//! Stop tracking a directory

use anyhow::Result;
use cli_lib::config::Config;
use cli_lib::ipc::Request;
use cli_lib::util;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(config: &Config, dir: &Path) -> Result<()> {
    let dir = util::resolve_dir(dir)?;

    let mut client = super::connect(config).await?;
    client.request(&Request::Unwatch { dir: dir.clone() }).await?;

    println!("Stopped watching {}", dir.display().to_string().cyan());
    Ok(())
}
