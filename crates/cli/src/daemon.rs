//! Daemon lifecycle management

use crate::config::Config;
use crate::ipc::{self, IpcClient, IpcError, IpcServer, Request};
use crate::locks::DaemonLock;
use anyhow::{Context, Result};
use journal::Journal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracker::Tracker;
use tt_core::SystemClock;

const LOG_FILE_PREFIX: &str = "daemon.log";

/// Run the daemon in the current process until it is told to stop
pub async fn start(config: &Config) -> Result<()> {
    let data_dir = config.data_dir()?;
    let socket_path = config.socket_path()?;

    let _log_guard = init_logging(&data_dir.join("logs"))?;

    let lock = DaemonLock::acquire(&data_dir)?;
    info!(
        pid = std::process::id(),
        data_dir = %data_dir.display(),
        socket = %socket_path.display(),
        "daemon starting"
    );

    let journal = open_journal(&data_dir, config.daemon.store_open_attempts).await?;
    let tracker = Tracker::new(
        Box::new(journal),
        Arc::new(SystemClock),
        config.tracker_settings(),
    );

    let listener = ipc::bind(&socket_path)
        .with_context(|| format!("Failed to bind {}", socket_path.display()))?;
    let server = tokio::spawn(IpcServer::new(tracker.clone()).serve(listener));

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    let outcome = tokio::select! {
        result = tracker.run_sync_loop() => result.context("Watch synchronization gave up"),
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt");
            Ok(())
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM");
            Ok(())
        }
    };

    if let Err(e) = &outcome {
        error!(error = format!("{:#}", e), "daemon failing");
    }

    tracker.shutdown();
    if let Err(e) = server.await {
        warn!(error = %e, "ipc server task failed");
    }
    if let Err(e) = std::fs::remove_file(&socket_path) {
        warn!(error = %e, "failed to remove socket");
    }
    lock.release()?;

    info!("daemon stopped");
    outcome
}

/// Ask a running daemon to shut down and wait for it to go away
pub async fn stop(config: &Config) -> Result<bool> {
    let socket_path = config.socket_path()?;
    let mut client = match IpcClient::connect(&socket_path).await {
        Ok(client) => client,
        Err(IpcError::NotRunning(_)) => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    client.request(&Request::Shutdown).await?;

    // the daemon releases its lock last
    let data_dir = config.data_dir()?;
    for _ in 0..50 {
        if DaemonLock::probe(&data_dir)?.is_none() {
            return Ok(true);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("Daemon did not stop within 5 seconds")
}

/// Check if daemon is running
pub fn is_running(config: &Config) -> bool {
    match config.data_dir() {
        Ok(data_dir) => matches!(DaemonLock::probe(&data_dir), Ok(Some(_))),
        Err(_) => false,
    }
}

/// Open the journal, backing off while another process still holds it
async fn open_journal(data_dir: &Path, attempts: u32) -> Result<Journal> {
    let mut delay = Duration::from_millis(100);
    let mut attempt = 1;
    loop {
        match Journal::open(data_dir) {
            Ok(journal) => return Ok(journal),
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, "failed to open journal, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to open journal after {} attempts", attempts)
                })
            }
        }
    }
}

/// Log to stdout and to a daily rolling file under `log_dir`
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir).context("Failed to create logs directory")?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sled=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
