//! Runtime tuning for the tracker

use std::time::Duration;

/// Tracker settings, in runtime form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Most persisted watches kept; older ones are evicted
    pub max_watches: usize,

    /// Period of the reconciliation loop
    pub sync_interval: Duration,

    /// How often a pending write is turned into a tick
    pub tick_flush_interval: Duration,

    /// Activity logging is suppressed this long after a watch starts
    pub quiet_period: Duration,

    /// How often idle watcher threads check for cancellation
    pub poll_interval: Duration,

    /// Longest gap between ticks that still counts as one interval
    pub max_event_gap: Duration,

    /// Extra gitignore-style patterns skipped under every watch
    pub ignore_patterns: Vec<String>,
}

impl TrackerSettings {
    pub fn max_event_gap_secs(&self) -> i64 {
        self.max_event_gap.as_secs() as i64
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            max_watches: 4,
            sync_interval: Duration::from_secs(3),
            tick_flush_interval: Duration::from_secs(3),
            quiet_period: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            max_event_gap: Duration::from_secs(23 * 60),
            ignore_patterns: Vec::new(),
        }
    }
}
