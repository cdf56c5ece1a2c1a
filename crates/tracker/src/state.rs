//! State shared by the API, the synchronizer, and per-watch workers

use crate::settings::TrackerSettings;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tt_core::{Clock, Repository};

/// Everything a per-watch worker needs, without the `Tracker` handle itself
///
/// Lock order: `sync_lock`, then `store`, then `live`. The store lock is
/// released before the live map lock is taken.
pub(crate) struct Shared {
    pub store: RwLock<Box<dyn Repository>>,
    pub live: Mutex<BTreeMap<PathBuf, Arc<LiveWatch>>>,
    /// Serializes reconciliation passes
    pub sync_lock: Mutex<()>,
    pub clock: Arc<dyn Clock>,
    pub settings: TrackerSettings,
    /// Parent of every live watch's token
    pub shutdown: CancellationToken,
    next_id: AtomicU64,
}

impl Shared {
    pub fn new(
        store: Box<dyn Repository>,
        clock: Arc<dyn Clock>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            store: RwLock::new(store),
            live: Mutex::new(BTreeMap::new()),
            sync_lock: Mutex::new(()),
            clock,
            settings,
            shutdown: CancellationToken::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Remove the live entry for `watch`, unless it was already replaced
    pub fn drop_live(&self, watch: &LiveWatch) -> bool {
        let mut live = self.live.lock();
        match live.get(&watch.dir) {
            Some(current) if current.id == watch.id => {
                live.remove(&watch.dir);
                true
            }
            _ => false,
        }
    }
}

/// An active OS-level watch
pub(crate) struct LiveWatch {
    /// Generation id; distinguishes a recreated watch on the same dir
    pub id: u64,
    pub dir: PathBuf,
    pub label: String,
    /// Set by the watcher thread on every event, cleared by the recorder
    pending: AtomicBool,
    pub cancel: CancellationToken,
    started: Instant,
}

impl LiveWatch {
    pub fn new(id: u64, dir: PathBuf, label: String, cancel: CancellationToken) -> Self {
        Self {
            id,
            dir,
            label,
            pending: AtomicBool::new(false),
            cancel,
            started: Instant::now(),
        }
    }

    pub fn mark_pending(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Clear the pending flag, returning whether it was set
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn in_quiet_period(&self, quiet: Duration) -> bool {
        self.started.elapsed() < quiet
    }
}
