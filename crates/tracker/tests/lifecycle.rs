//! Watch lifecycle tests against a real journal and real directories

use journal::Journal;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracker::{Tracker, TrackerError, TrackerSettings};
use tt_core::repo::StoreResult;
use tt_core::{Repository, StoreError, TestClock, TickRow, Timestamp, WatchRow};

fn fast_settings() -> TrackerSettings {
    TrackerSettings {
        sync_interval: Duration::from_millis(50),
        tick_flush_interval: Duration::from_millis(50),
        quiet_period: Duration::ZERO,
        poll_interval: Duration::from_millis(20),
        ..TrackerSettings::default()
    }
}

fn tracker_with(settings: TrackerSettings, clock: Arc<TestClock>) -> Tracker {
    Tracker::new(Box::new(Journal::temporary().unwrap()), clock, settings)
}

fn tracker() -> (Tracker, Arc<TestClock>) {
    let clock = Arc::new(TestClock::new(1_000));
    (tracker_with(fast_settings(), clock.clone()), clock)
}

/// Scratch dirs `<tmp>/<name>` for each name
fn dirs(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
    let tmp = TempDir::new().unwrap();
    let paths = names
        .iter()
        .map(|name| {
            let path = tmp.path().join(name);
            fs::create_dir_all(&path).unwrap();
            path
        })
        .collect();
    (tmp, paths)
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {}", what);
}

fn live_dirs(tracker: &Tracker) -> Vec<PathBuf> {
    tracker
        .get_watches()
        .unwrap()
        .into_iter()
        .map(|w| w.dir)
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_watch_goes_live() {
    let (tracker, _clock) = tracker();
    let (_tmp, paths) = dirs(&["src"]);

    let info = tracker.start_watch(&paths[0], "").unwrap();
    assert_eq!(info.label, "src");
    assert_eq!(info.last_write, Some(1_000));

    let watches = tracker.get_watches().unwrap();
    assert_eq!(watches.len(), 1);
    assert_eq!(watches[0].dir, paths[0]);
    assert_eq!(watches[0].last_write, Some(1_000));

    tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reconciliation_is_idempotent() {
    let (tracker, _clock) = tracker();
    let (_tmp, paths) = dirs(&["a", "b"]);
    tracker.start_watch(&paths[0], "a").unwrap();
    tracker.start_watch(&paths[1], "b").unwrap();

    let before = live_dirs(&tracker);
    let report = tracker.sync_watches().unwrap();
    assert!(report.is_empty(), "{:?}", report);
    assert_eq!(live_dirs(&tracker), before);

    tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nested_watches_are_rejected() {
    let (tracker, _clock) = tracker();
    let (_tmp, paths) = dirs(&["x/foo", "x/foo/inner", "x/foobar"]);
    let parent = paths[0].parent().unwrap().to_path_buf();

    tracker.start_watch(&paths[0], "foo").unwrap();

    for dir in [&paths[0], &paths[1], &parent] {
        match tracker.start_watch(dir, "") {
            Err(TrackerError::AlreadyWatched { existing, .. }) => assert_eq!(existing, paths[0]),
            other => panic!("expected AlreadyWatched for {:?}, got {:?}", dir, other),
        }
    }

    // a sibling sharing a name prefix does not nest
    tracker.start_watch(&paths[2], "foobar").unwrap();
    assert_eq!(live_dirs(&tracker).len(), 2);

    tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_capacity_evicts_least_recently_written() {
    let clock = Arc::new(TestClock::new(1_000));
    let settings = TrackerSettings {
        max_watches: 2,
        ..fast_settings()
    };
    let tracker = tracker_with(settings, clock.clone());
    let (_tmp, paths) = dirs(&["one", "two", "three"]);

    for path in &paths {
        tracker.start_watch(path, "").unwrap();
        clock.advance(10);
    }

    let live = live_dirs(&tracker);
    assert_eq!(live.len(), 2);
    assert!(!live.contains(&paths[0]));

    let status = tracker.status().unwrap();
    assert_eq!(status.desired_watches, 2);
    assert_eq!(status.live_watches, 2);

    // writes under the evicted dir are no longer recorded
    let ticks_before = status.ticks;
    clock.advance(10);
    fs::write(paths[0].join("late.txt"), b"ignored").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let status = tracker.status().unwrap();
    assert_eq!(status.ticks, ticks_before);
    assert_eq!(status.desired_watches, 2);
    assert!(!live_dirs(&tracker).contains(&paths[0]));

    tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_write_produces_tick_and_interval() {
    let (tracker, clock) = tracker();
    let (_tmp, paths) = dirs(&["project"]);
    tracker.start_watch(&paths[0], "project").unwrap();

    clock.set(2_000);
    let file = paths[0].join("notes.md");
    eventually("a tick for the write", || {
        fs::write(&file, b"hello").unwrap();
        tracker.status().unwrap().ticks > 0
    })
    .await;

    let watches = tracker.get_watches().unwrap();
    assert_eq!(watches[0].last_write, Some(2_000));

    clock.set(2_060);
    let response = tracker.get_intervals(1_900, 2_100).unwrap();
    assert_eq!(response.intervals.len(), 1);
    assert_eq!(response.intervals[0].start, 2_000);
    assert_eq!(response.intervals[0].end, 2_060);
    assert_eq!(response.end_gap, 60);
    assert!(response.by_label.contains_key("project"));

    tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_watch() {
    let (tracker, _clock) = tracker();
    let (_tmp, paths) = dirs(&["src"]);
    tracker.start_watch(&paths[0], "src").unwrap();

    tracker.stop_watch(&paths[0]).unwrap();
    assert!(tracker.get_watches().unwrap().is_empty());

    assert!(matches!(
        tracker.stop_watch(&paths[0]),
        Err(TrackerError::NotWatched(_))
    ));

    tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deleted_dir_leaves_live_set() {
    let (tracker, _clock) = tracker();
    let (_tmp, paths) = dirs(&["doomed"]);
    tracker.start_watch(&paths[0], "doomed").unwrap();
    assert_eq!(live_dirs(&tracker), vec![paths[0].clone()]);

    fs::remove_dir_all(&paths[0]).unwrap();
    eventually("the watcher to exit", || live_dirs(&tracker).is_empty()).await;

    // the row survives, so a pass recreates the watch once the dir is back
    fs::create_dir(&paths[0]).unwrap();
    let report = tracker.sync_watches().unwrap();
    assert_eq!(report.created, vec![paths[0].clone()]);

    tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_manual_ticks_and_validation() {
    let (tracker, clock) = tracker();

    tracker.record_tick("meeting").unwrap();
    clock.advance(300);
    tracker.record_tick("meeting").unwrap();
    clock.advance(5_000);

    let response = tracker.get_intervals(0, 10_000).unwrap();
    assert_eq!(response.intervals.len(), 1);
    assert_eq!(response.intervals[0].start, 1_000);
    assert_eq!(response.intervals[0].end, 1_300);
    assert_eq!(response.end_gap, 0);

    assert!(matches!(
        tracker.record_tick(""),
        Err(TrackerError::Validation(_))
    ));
    assert!(matches!(
        tracker.get_intervals(10, 5),
        Err(TrackerError::Validation(_))
    ));
    assert!(matches!(
        tracker.start_watch(Path::new("relative/dir"), ""),
        Err(TrackerError::Validation(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clear_drops_everything() {
    let (tracker, _clock) = tracker();
    let (_tmp, paths) = dirs(&["src"]);
    tracker.start_watch(&paths[0], "src").unwrap();
    tracker.record_tick("src").unwrap();

    tracker.clear().unwrap();

    let status = tracker.status().unwrap();
    assert_eq!(status.ticks, 0);
    assert_eq!(status.desired_watches, 0);
    assert_eq!(status.live_watches, 0);

    tracker.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_loop_restores_persisted_watches() {
    let (_tmp, paths) = dirs(&["kept"]);
    let journal = Journal::temporary().unwrap();
    journal.upsert_watch(&paths[0], "kept", 10).unwrap();

    let tracker = Tracker::new(
        Box::new(journal),
        Arc::new(TestClock::new(1_000)),
        fast_settings(),
    );
    let looping = tracker.clone();
    let handle = tokio::spawn(async move { looping.run_sync_loop().await });

    eventually("persisted watch to go live", || {
        live_dirs(&tracker) == vec![paths[0].clone()]
    })
    .await;

    tracker.shutdown();
    handle.await.unwrap().unwrap();
}

/// Store whose every call fails
struct BrokenStore;

impl BrokenStore {
    fn fail<T>() -> StoreResult<T> {
        Err(StoreError::Backend("disk on fire".into()))
    }
}

impl Repository for BrokenStore {
    fn insert_tick_if_absent(&self, _: Timestamp, _: &str) -> StoreResult<()> {
        Self::fail()
    }
    fn update_last_write(&self, _: &Path, _: Timestamp) -> StoreResult<()> {
        Self::fail()
    }
    fn record_activity(&self, _: &Path, _: &str, _: Timestamp) -> StoreResult<()> {
        Self::fail()
    }
    fn list_watches(&self) -> StoreResult<Vec<WatchRow>> {
        Self::fail()
    }
    fn list_ticks(&self, _: Timestamp, _: Timestamp) -> StoreResult<Vec<TickRow>> {
        Self::fail()
    }
    fn upsert_watch(&self, _: &Path, _: &str, _: Timestamp) -> StoreResult<()> {
        Self::fail()
    }
    fn delete_watch(&self, _: &Path) -> StoreResult<bool> {
        Self::fail()
    }
    fn evict_oldest_watches(&self, _: usize) -> StoreResult<Vec<WatchRow>> {
        Self::fail()
    }
    fn clear(&self) -> StoreResult<()> {
        Self::fail()
    }
    fn tick_count(&self) -> StoreResult<usize> {
        Self::fail()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_loop_gives_up_after_repeated_failures() {
    let tracker = Tracker::new(
        Box::new(BrokenStore),
        Arc::new(TestClock::new(0)),
        fast_settings(),
    );

    match tracker.run_sync_loop().await {
        Err(TrackerError::SyncFailed { failures, .. }) => assert_eq!(failures, 3),
        other => panic!("expected SyncFailed, got {:?}", other),
    }
}
