//! Tick-to-interval aggregation
//!
//! Ticks are fed, in time order, into an `IntervalCollector`. Runs of ticks
//! separated by at most the gap threshold form one interval; a wider gap
//! closes the current interval and opens the next one. Every emitted interval
//! is clipped to the collector's window, and intervals that clip to nothing
//! are dropped.

use crate::model::{TickRow, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed query range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Window {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }
}

/// A period of continuous activity, `end > start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: Timestamp,
    pub end: Timestamp,
    /// Activity label, or "" for the union of all activity
    #[serde(default)]
    pub label: String,
}

impl Interval {
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

/// Converts an ordered sequence of tick times into intervals
#[derive(Debug, Clone)]
pub struct IntervalCollector {
    window: Window,
    max_gap: i64,
    label: String,
    /// Interval under construction; `end` advances until a wide gap
    current: Option<(Timestamp, Timestamp)>,
    intervals: Vec<Interval>,
}

impl IntervalCollector {
    /// Collector for the union of all ticks (label "")
    pub fn new(window: Window, max_gap: i64) -> Self {
        Self::labeled(window, max_gap, "")
    }

    pub fn labeled(window: Window, max_gap: i64, label: impl Into<String>) -> Self {
        Self {
            window,
            max_gap,
            label: label.into(),
            current: None,
            intervals: Vec::new(),
        }
    }

    /// Add the tick at time `t`
    pub fn add(&mut self, t: Timestamp) {
        match self.current {
            None => self.current = Some((t, t)),
            // Already past the window: nothing later can be emitted
            Some((start, _)) if start > self.window.end => {}
            Some((start, end)) if t - end <= self.max_gap => {
                self.current = Some((start, end.max(t)));
            }
            Some(_) => {
                self.close_current();
                self.current = Some((t, t));
            }
        }
    }

    /// Close the last interval and return everything collected
    pub fn finish(mut self) -> Vec<Interval> {
        self.close_current();
        self.intervals
    }

    fn close_current(&mut self) {
        let Some((start, end)) = self.current.take() else {
            return;
        };
        let clipped = Interval {
            start: start.max(self.window.start),
            end: end.min(self.window.end),
            label: self.label.clone(),
        };
        if clipped.end > clipped.start {
            self.intervals.push(clipped);
        }
    }
}

/// Result of aggregating ticks over a window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalsResponse {
    /// Intervals of the union of all activity, sorted and disjoint
    pub intervals: Vec<Interval>,

    /// Intervals per activity label
    #[serde(default)]
    pub by_label: BTreeMap<String, Vec<Interval>>,

    /// Seconds appended to the last interval to reach "now", or 0 if the last
    /// interval was not extended. Lets callers tell recorded time apart from
    /// time that is only presumed to be still in progress.
    #[serde(default)]
    pub end_gap: i64,
}

/// Aggregate time-ordered `ticks` into union and per-label intervals
///
/// When the active label changes, the new label's collector is seeded with
/// the previous tick's time so adjacent labeled intervals touch. If the last
/// tick is less than `max_gap` before `now`, the trailing interval is
/// extended to `now` and the extension is reported as `end_gap`.
pub fn collect_intervals(
    ticks: &[TickRow],
    window: Window,
    max_gap: i64,
    now: Timestamp,
) -> IntervalsResponse {
    let mut union = IntervalCollector::new(window, max_gap);
    let mut labeled: BTreeMap<String, IntervalCollector> = BTreeMap::new();
    let mut prev: Option<(&str, Timestamp)> = None;

    for tick in ticks {
        let collector = labeled
            .entry(tick.label.clone())
            .or_insert_with(|| IntervalCollector::labeled(window, max_gap, tick.label.as_str()));

        if let Some((prev_label, prev_time)) = prev {
            if prev_label != tick.label {
                collector.add(prev_time);
            }
        }

        collector.add(tick.time);
        union.add(tick.time);
        prev = Some((tick.label.as_str(), tick.time));
    }

    let mut end_gap = 0;
    if let Some((label, last)) = prev {
        let gap = now - last;
        if (0..max_gap).contains(&gap) {
            if let Some(collector) = labeled.get_mut(label) {
                collector.add(now);
            }
            union.add(now);
            end_gap = gap;
        }
    }

    IntervalsResponse {
        intervals: union.finish(),
        by_label: labeled
            .into_iter()
            .map(|(label, collector)| (label, collector.finish()))
            .filter(|(_, intervals)| !intervals.is_empty())
            .collect(),
        end_gap,
    }
}
