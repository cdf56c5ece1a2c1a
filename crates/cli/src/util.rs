//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use std::path::{Path, PathBuf};
use tt_core::Timestamp;

pub fn now_unix() -> Timestamp {
    chrono::Utc::now().timestamp()
}

/// Format a Unix timestamp as local time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts: Timestamp) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// Format a Unix timestamp as local wall-clock time ("14:30")
pub fn format_clock_time(ts: Timestamp) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(time) => time.format("%H:%M").to_string(),
        None => ts.to_string(),
    }
}

/// Format a timestamp relative to `now` ("2 hours ago")
pub fn format_relative_time(ts: Timestamp, now: Timestamp) -> String {
    let seconds = now - ts;
    if seconds < 0 {
        return "in the future".to_string();
    }

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format a span of seconds ("2h 05m", "12m 30s", "45s")
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// `[start, end]` covering a whole local calendar day
pub fn day_window(date: NaiveDate) -> Result<(Timestamp, Timestamp)> {
    let start = local_timestamp(date.and_time(NaiveTime::MIN))?;
    let next = date.succ_opt().context("Date out of range")?;
    let end = local_timestamp(next.and_time(NaiveTime::MIN))? - 1;
    Ok((start, end))
}

fn local_timestamp(naive: NaiveDateTime) -> Result<Timestamp> {
    // earliest() resolves DST folds; a gap at midnight has no local instant
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|time| time.timestamp())
        .with_context(|| format!("{} does not exist in the local time zone", naive))
}

/// Parse a point in time given on the command line
///
/// Accepts Unix seconds, RFC 3339, or local "YYYY-MM-DD HH:MM[:SS]".
pub fn parse_time(input: &str) -> Result<Timestamp> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<i64>() {
        return Ok(secs);
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Ok(time.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return local_timestamp(naive);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return local_timestamp(date.and_time(NaiveTime::MIN));
    }
    anyhow::bail!(
        "Unrecognized time '{}' (use Unix seconds, RFC 3339, or YYYY-MM-DD HH:MM)",
        input
    )
}

/// Absolute, symlink-free form of a dir named on the command line
///
/// Falls back to joining with the current dir when the path no longer
/// exists, so a deleted dir can still be unwatched.
pub fn resolve_dir(dir: &Path) -> Result<PathBuf> {
    match std::fs::canonicalize(dir) {
        Ok(path) => Ok(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if dir.is_absolute() {
                Ok(dir.to_path_buf())
            } else {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(dir))
            }
        }
        Err(e) => Err(e).with_context(|| format!("Failed to resolve {}", dir.display())),
    }
}
