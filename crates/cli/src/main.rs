//! tt CLI - activity time tracker

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

use cli_lib::config;

/// tt - Track time spent in directories from filesystem activity
#[derive(Parser)]
#[command(name = "tt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon
    Start {
        /// Run in foreground (for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Show daemon and watch status
    Status,
    /// Start tracking activity under a directory
    Watch {
        /// Directory to watch (defaults to the current directory)
        dir: Option<PathBuf>,
        /// Activity label (default: the directory's name)
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Stop tracking a directory
    Unwatch {
        /// Directory previously passed to `tt watch`
        dir: PathBuf,
    },
    /// Record activity for a label right now
    Tick {
        /// Activity label
        label: String,
    },
    /// List live watches
    Watches,
    /// Show activity intervals
    Intervals {
        /// Local calendar day (default: today)
        #[arg(long, conflicts_with_all = ["start", "end"])]
        date: Option<String>,
        /// Window start (Unix seconds, RFC 3339, or "YYYY-MM-DD HH:MM")
        #[arg(long, requires = "end")]
        start: Option<String>,
        /// Window end
        #[arg(long, requires = "start")]
        end: Option<String>,
        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all ticks and watches
    Clear {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show the effective configuration
    Config {
        /// Only print the config file location
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // the daemon installs its own subscriber with a file writer
    if !matches!(cli.command, Commands::Start { foreground: true }) {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let config = config::load()?;

    match cli.command {
        Commands::Start { foreground } => cmd::start::run(&config, foreground).await,
        Commands::Stop => cmd::stop::run(&config).await,
        Commands::Status => cmd::status::run(&config).await,
        Commands::Watch { dir, label } => cmd::watch::run(&config, dir, label).await,
        Commands::Unwatch { dir } => cmd::unwatch::run(&config, &dir).await,
        Commands::Tick { label } => cmd::tick::run(&config, &label).await,
        Commands::Watches => cmd::watches::run(&config).await,
        Commands::Intervals { date, start, end, json } => {
            cmd::intervals::run(&config, date, start, end, json).await
        }
        Commands::Clear { yes } => cmd::clear::run(&config, yes).await,
        Commands::Config { path } => cmd::config::run(&config, path),
    }
}
