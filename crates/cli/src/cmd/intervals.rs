//! Show activity intervals

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use cli_lib::config::Config;
use cli_lib::util;
use owo_colors::OwoColorize;
use tt_core::{Interval, IntervalsResponse, Timestamp};

pub async fn run(
    config: &Config,
    date: Option<String>,
    start: Option<String>,
    end: Option<String>,
    json: bool,
) -> Result<()> {
    let (start, end) = resolve_window(date, start, end)?;

    let mut client = super::connect(config).await?;
    let response = client.intervals(start, end).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_response(start, end, &response);
    Ok(())
}

fn resolve_window(
    date: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<(Timestamp, Timestamp)> {
    if let (Some(start), Some(end)) = (start, end) {
        return Ok((util::parse_time(&start)?, util::parse_time(&end)?));
    }

    let day = match date {
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}' (use YYYY-MM-DD)", date))?,
        None => Local::now().date_naive(),
    };
    util::day_window(day)
}

fn print_response(start: Timestamp, end: Timestamp, response: &IntervalsResponse) {
    println!(
        "{} {} → {}",
        "Activity".bold(),
        util::format_absolute_time(start),
        util::format_absolute_time(end)
    );
    println!();

    if response.intervals.is_empty() {
        println!("{}", "No activity recorded".dimmed());
        return;
    }

    for interval in &response.intervals {
        println!("  {}", format_interval(interval));
    }
    println!();

    let width = response.by_label.keys().map(String::len).max().unwrap_or(0);
    for (label, intervals) in &response.by_label {
        let total: i64 = intervals.iter().map(Interval::duration).sum();
        println!(
            "  {:width$}  {:>8}  ({} intervals)",
            label.yellow(),
            util::format_duration(total),
            intervals.len(),
            width = width
        );
    }

    let total: i64 = response.intervals.iter().map(Interval::duration).sum();
    println!();
    println!("Total:  {}", util::format_duration(total).bold());
    if response.end_gap > 0 {
        println!(
            "  {}",
            format!(
                "includes {} since the last recorded activity",
                util::format_duration(response.end_gap)
            )
            .dimmed()
        );
    }
}

fn format_interval(interval: &Interval) -> String {
    format!(
        "{} - {}  {}",
        util::format_clock_time(interval.start),
        util::format_clock_time(interval.end),
        util::format_duration(interval.duration())
    )
}
