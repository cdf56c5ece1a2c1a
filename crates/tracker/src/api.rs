//! Public tracker handle

use crate::error::{Result, TrackerError};
use crate::settings::TrackerSettings;
use crate::state::Shared;
use crate::sync::SyncReport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tt_core::path::{default_label, find_overlap, normalize_watch_dir};
use tt_core::{
    collect_intervals, Clock, IntervalsResponse, Repository, Timestamp, ValidationError, WatchInfo,
    Window,
};

/// Consecutive failed passes after which the sync loop gives up
pub const MAX_CONSECUTIVE_SYNC_FAILURES: u32 = 3;

/// Snapshot of tracker state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStatus {
    pub desired_watches: usize,
    pub live_watches: usize,
    pub max_watches: usize,
    pub ticks: usize,
}

/// Handle to the tracker; cheap to clone
///
/// Methods that reconcile watches spawn tick recorders and must be called
/// from within a tokio runtime.
#[derive(Clone)]
pub struct Tracker {
    shared: Arc<Shared>,
}

impl Tracker {
    pub fn new(
        store: Box<dyn Repository>,
        clock: Arc<dyn Clock>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(store, clock, settings)),
        }
    }

    /// Persist a watch on `dir` and start it
    ///
    /// An empty label defaults to the dir's base name. Fails with
    /// `AlreadyWatched` if `dir` equals, contains, or lies inside an
    /// existing watch.
    pub fn start_watch(&self, dir: &Path, label: &str) -> Result<WatchInfo> {
        let dir = normalize_watch_dir(dir)?;
        let label = match label.trim() {
            "" => default_label(&dir),
            label => label.to_string(),
        };
        let now = self.shared.clock.now();

        {
            let store = self.shared.store.write();
            let rows = store.list_watches()?;
            if let Some(existing) = find_overlap(&dir, rows.iter().map(|row| row.dir.as_path())) {
                return Err(TrackerError::AlreadyWatched {
                    dir,
                    existing: existing.to_path_buf(),
                });
            }
            store.upsert_watch(&dir, &label, now)?;
        }
        info!(dir = %dir.display(), label = %label, "watch requested");

        self.sync_watches()?;
        Ok(WatchInfo {
            dir,
            label,
            last_write: Some(now),
        })
    }

    /// Forget the watch on `dir` and stop it
    pub fn stop_watch(&self, dir: &Path) -> Result<()> {
        let dir = normalize_watch_dir(dir)?;
        if !self.shared.store.write().delete_watch(&dir)? {
            return Err(TrackerError::NotWatched(dir));
        }
        info!(dir = %dir.display(), "watch dropped");

        self.sync_watches()?;
        Ok(())
    }

    /// Live watches with their last write time, in dir byte order
    pub fn get_watches(&self) -> Result<Vec<WatchInfo>> {
        let last_writes: HashMap<_, _> = self
            .shared
            .store
            .read()
            .list_watches()?
            .into_iter()
            .map(|row| (row.dir, row.last_write))
            .collect();

        let mut watches: Vec<WatchInfo> = self
            .shared
            .live
            .lock()
            .values()
            .map(|watch| WatchInfo {
                dir: watch.dir.clone(),
                label: watch.label.clone(),
                last_write: last_writes.get(&watch.dir).copied(),
            })
            .collect();
        watches.sort_by(|a, b| a.dir.as_os_str().cmp(b.dir.as_os_str()));
        Ok(watches)
    }

    /// Record a tick for `label` at the current time
    pub fn record_tick(&self, label: &str) -> Result<Timestamp> {
        if label.is_empty() {
            return Err(ValidationError::EmptyLabel.into());
        }

        let now = self.shared.clock.now();
        self.shared.store.write().insert_tick_if_absent(now, label)?;
        debug!(label, time = now, "manual tick recorded");
        Ok(now)
    }

    /// Activity intervals within `[start, end]`
    ///
    /// Ticks up to one max gap outside the window are included so intervals
    /// crossing its edges come out clipped rather than cut short.
    pub fn get_intervals(&self, start: Timestamp, end: Timestamp) -> Result<IntervalsResponse> {
        if start > end {
            return Err(ValidationError::InvertedRange { start, end }.into());
        }

        let gap = self.shared.settings.max_event_gap_secs();
        let ticks = self
            .shared
            .store
            .read()
            .list_ticks(start.saturating_sub(gap), end.saturating_add(gap))?;
        let now = self.shared.clock.now();

        Ok(collect_intervals(&ticks, Window::new(start, end), gap, now))
    }

    /// Drop every tick and watch
    pub fn clear(&self) -> Result<()> {
        self.shared.store.write().clear()?;
        info!("journal cleared");
        self.sync_watches()?;
        Ok(())
    }

    pub fn status(&self) -> Result<TrackerStatus> {
        let (desired_watches, ticks) = {
            let store = self.shared.store.read();
            (store.list_watches()?.len(), store.tick_count()?)
        };
        Ok(TrackerStatus {
            desired_watches,
            live_watches: self.shared.live.lock().len(),
            max_watches: self.shared.settings.max_watches,
            ticks,
        })
    }

    /// Converge the live watches to the persisted ones
    pub fn sync_watches(&self) -> Result<SyncReport> {
        self.shared.sync_watches()
    }

    /// Reconcile every sync interval until shutdown
    ///
    /// The first pass runs immediately, restoring persisted watches. Returns
    /// an error after `MAX_CONSECUTIVE_SYNC_FAILURES` failed passes in a row.
    pub async fn run_sync_loop(&self) -> Result<()> {
        let mut timer = interval(self.shared.settings.sync_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0;

        loop {
            tokio::select! {
                _ = self.shared.shutdown.cancelled() => return Ok(()),
                _ = timer.tick() => {}
            }

            match self.sync_watches() {
                Ok(_) => failures = 0,
                Err(e) => {
                    failures += 1;
                    warn!(failures, error = %e, "watch synchronization failed");
                    if failures >= MAX_CONSECUTIVE_SYNC_FAILURES {
                        return Err(TrackerError::SyncFailed {
                            failures,
                            last: Box::new(e),
                        });
                    }
                }
            }
        }
    }

    /// Token cancelled by `shutdown`
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shared.shutdown.clone()
    }

    /// Stop every live watch and the sync loop
    pub fn shutdown(&self) {
        let _pass = self.shared.sync_lock.lock();
        self.shared.shutdown.cancel();
        let stopped = {
            let mut live = self.shared.live.lock();
            let stopped = live.len();
            live.clear();
            stopped
        };
        info!(stopped, "tracker shut down");
    }
}
