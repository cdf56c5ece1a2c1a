//! Reconciliation of live watches against the persisted watch table
//!
//! The store is the source of truth. Each pass:
//! 1. Evicts the least recently written rows beyond `max_watches`
//! 2. Merge-joins the rows with the live watches, both in dir byte order
//! 3. Starts a watch for every row without one and stops every live watch
//!    without a row

use crate::error::Result;
use crate::recorder::TickRecorder;
use crate::state::{LiveWatch, Shared};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};
use tt_core::WatchRow;
use watcher::{WatchError, WatchOptions};

/// What a reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Dirs that got a new live watch
    pub created: Vec<PathBuf>,
    /// Dirs whose live watch was stopped
    pub removed: Vec<PathBuf>,
    /// Dirs whose persisted watch was evicted for capacity
    pub evicted: Vec<PathBuf>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty() && self.evicted.is_empty()
    }
}

impl Shared {
    /// Run one reconciliation pass
    pub(crate) fn sync_watches(self: &Arc<Self>) -> Result<SyncReport> {
        let _pass = self.sync_lock.lock();
        if self.shutdown.is_cancelled() {
            return Ok(SyncReport::default());
        }

        let (evicted, mut desired) = {
            let store = self.store.write();
            let evicted = store.evict_oldest_watches(self.settings.max_watches)?;
            (evicted, store.list_watches()?)
        };
        desired.sort_by(|a, b| a.dir.as_os_str().cmp(b.dir.as_os_str()));

        let mut report = SyncReport::default();
        for row in evicted {
            info!(
                dir = %row.dir.display(),
                label = %row.label,
                last_write = row.last_write,
                max_watches = self.settings.max_watches,
                "evicted watch"
            );
            report.evicted.push(row.dir);
        }

        let mut live = self.live.lock();
        let mut live_dirs: Vec<PathBuf> = live.keys().cloned().collect();
        live_dirs.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

        let (mut i, mut j) = (0, 0);
        loop {
            let order = match (desired.get(i), live_dirs.get(j)) {
                (Some(row), Some(dir)) => row.dir.as_os_str().cmp(dir.as_os_str()),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };

            match order {
                Ordering::Less => {
                    let row = &desired[i];
                    if let Some(watch) = self.start(row) {
                        info!(dir = %row.dir.display(), label = %row.label, "watch created");
                        live.insert(row.dir.clone(), watch);
                        report.created.push(row.dir.clone());
                    }
                    i += 1;
                }
                Ordering::Greater => {
                    let dir = &live_dirs[j];
                    if let Some(watch) = live.remove(dir) {
                        watch.cancel.cancel();
                        info!(dir = %dir.display(), "watch removed");
                        report.removed.push(dir.clone());
                    }
                    j += 1;
                }
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }

        if !report.is_empty() {
            debug!(
                created = report.created.len(),
                removed = report.removed.len(),
                evicted = report.evicted.len(),
                live = live.len(),
                "reconciliation pass"
            );
        }
        Ok(report)
    }

    /// Start the watcher thread and tick recorder for `row`
    fn start(self: &Arc<Self>, row: &WatchRow) -> Option<Arc<LiveWatch>> {
        let watch = Arc::new(LiveWatch::new(
            self.next_id(),
            row.dir.clone(),
            row.label.clone(),
            self.shutdown.child_token(),
        ));

        let shared = Arc::clone(self);
        let worker = Arc::clone(&watch);
        let spawned = thread::Builder::new()
            .name(format!("watch {}", row.dir.display()))
            .spawn(move || run_watcher(shared, worker));

        if let Err(e) = spawned {
            warn!(dir = %row.dir.display(), error = %e, "failed to spawn watcher thread");
            watch.cancel.cancel();
            return None;
        }

        tokio::spawn(TickRecorder::new(Arc::clone(self), Arc::clone(&watch)).run());
        Some(watch)
    }
}

/// Body of a watcher thread
fn run_watcher(shared: Arc<Shared>, watch: Arc<LiveWatch>) {
    let options = WatchOptions {
        cancel: Some(watch.cancel.clone()),
        poll_interval: shared.settings.poll_interval,
        ignore_patterns: shared.settings.ignore_patterns.clone(),
    };
    let quiet = shared.settings.quiet_period;

    let result = watcher::watch(&watch.dir, options, |event| {
        watch.mark_pending();
        if !watch.in_quiet_period(quiet) {
            debug!(label = %watch.label, %event, "activity");
        }
        Ok(())
    });

    let Err(e) = result else {
        debug!(dir = %watch.dir.display(), "watcher stopped");
        return;
    };

    match e {
        WatchError::RootDeleted(_) => {
            warn!(dir = %watch.dir.display(), "watched dir was deleted");
        }
        other => {
            warn!(dir = %watch.dir.display(), error = %other, "watcher failed");
        }
    }

    // the next pass recreates the watch if its row is still persisted
    watch.cancel.cancel();
    shared.drop_live(&watch);
}
