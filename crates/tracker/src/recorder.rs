//! Per-watch tick recorder
//!
//! The watcher thread only sets a flag. Every flush interval the recorder
//! clears it and, if it was set, writes one tick and the watch's last write
//! time in a single store transaction. A burst of writes therefore costs one
//! store write, and an evicted watch (whose row is gone) records nothing.

use crate::state::{LiveWatch, Shared};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, trace};
use tt_core::StoreError;

pub(crate) struct TickRecorder {
    shared: Arc<Shared>,
    watch: Arc<LiveWatch>,
}

impl TickRecorder {
    pub fn new(shared: Arc<Shared>, watch: Arc<LiveWatch>) -> Self {
        Self { shared, watch }
    }

    /// Flush on every interval until the watch is cancelled
    pub async fn run(self) {
        let mut timer = interval(self.shared.settings.tick_flush_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        timer.tick().await;

        loop {
            tokio::select! {
                _ = self.watch.cancel.cancelled() => break,
                _ = timer.tick() => {
                    self.flush();
                }
            }
        }

        trace!(dir = %self.watch.dir.display(), "tick recorder stopped");
    }

    /// Write a tick if anything happened since the last flush
    ///
    /// Returns whether a tick was written.
    pub fn flush(&self) -> bool {
        if !self.watch.take_pending() {
            return false;
        }

        let now = self.shared.clock.now();
        let result = self
            .shared
            .store
            .write()
            .record_activity(&self.watch.dir, &self.watch.label, now);

        match result {
            Ok(()) => {
                if !self.watch.in_quiet_period(self.shared.settings.quiet_period) {
                    debug!(
                        dir = %self.watch.dir.display(),
                        label = %self.watch.label,
                        time = now,
                        "tick recorded"
                    );
                }
                true
            }
            Err(StoreError::UnknownWatch(dir)) => {
                debug!(dir = %dir.display(), "watch no longer persisted, tick dropped");
                false
            }
            Err(e) => {
                error!(
                    dir = %self.watch.dir.display(),
                    error = %e,
                    "failed to record tick"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TrackerSettings;
    use journal::Journal;
    use std::path::{Path, PathBuf};
    use tokio_util::sync::CancellationToken;
    use tt_core::TestClock;

    fn recorder(clock: Arc<TestClock>) -> TickRecorder {
        let shared = Arc::new(Shared::new(
            Box::new(Journal::temporary().unwrap()),
            clock,
            TrackerSettings::default(),
        ));
        let watch = Arc::new(LiveWatch::new(
            1,
            PathBuf::from("/w"),
            "work".into(),
            CancellationToken::new(),
        ));
        TickRecorder::new(shared, watch)
    }

    #[test]
    fn test_burst_becomes_one_tick() {
        let clock = Arc::new(TestClock::new(500));
        let recorder = recorder(clock.clone());
        recorder.shared.store.write().upsert_watch(Path::new("/w"), "work", 1).unwrap();

        assert!(!recorder.flush());
        for _ in 0..10 {
            recorder.watch.mark_pending();
        }
        assert!(recorder.flush());
        assert!(!recorder.flush());

        let store = recorder.shared.store.read();
        assert_eq!(store.tick_count().unwrap(), 1);
        assert_eq!(store.list_watches().unwrap()[0].last_write, 500);
    }

    #[test]
    fn test_evicted_watch_records_nothing() {
        let recorder = recorder(Arc::new(TestClock::new(500)));

        recorder.watch.mark_pending();
        assert!(!recorder.flush());
        assert_eq!(recorder.shared.store.read().tick_count().unwrap(), 0);
    }
}
