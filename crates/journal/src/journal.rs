//! sled-backed tick and watch journal

use crate::codec::{self, WatchRecord};
use crate::{JournalError, Result};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree,
};
use sled::{Batch, Db, Transactional, Tree};
use std::path::Path;
use tracing::{debug, trace};
use tt_core::repo::StoreResult;
use tt_core::{Repository, TickRow, Timestamp, WatchRow};

const TICKS_TREE: &str = "ticks";
const WATCHES_TREE: &str = "watches";

/// Durable store for ticks and desired watches
pub struct Journal {
    /// Sled database
    db: Db,
    /// time -> label
    ticks: Tree,
    /// dir -> WatchRecord
    watches: Tree,
}

impl Journal {
    /// Open or create a journal in the given data directory
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db = sled::open(data_dir.join("journal"))?;
        Self::from_db(db)
    }

    /// Open a journal that is deleted when dropped
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let ticks = db.open_tree(TICKS_TREE)?;
        let watches = db.open_tree(WATCHES_TREE)?;
        Ok(Self { db, ticks, watches })
    }

    /// Flush to ensure durability
    fn sync(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn put_tick(&self, time: Timestamp, label: &str) -> Result<()> {
        let key = codec::tick_key(time);
        if let Err(existing) = self
            .ticks
            .compare_and_swap(key, None::<&[u8]>, Some(label.as_bytes()))?
        {
            trace!(time, current = ?existing.current, "tick already recorded");
        }
        self.sync()
    }

    fn touch(&self, dir: &Path, time: Timestamp) -> Result<()> {
        self.watches
            .transaction(|watches| touch_watch(watches, dir, time))?;
        self.sync()
    }

    fn record(&self, dir: &Path, label: &str, time: Timestamp) -> Result<()> {
        let key = codec::tick_key(time);
        (&self.ticks, &self.watches).transaction(|(ticks, watches)| {
            if ticks.get(key)?.is_none() {
                ticks.insert(&key[..], label.as_bytes())?;
            }
            touch_watch(watches, dir, time)
        })?;
        self.sync()
    }

    fn read_watches(&self) -> Result<Vec<WatchRow>> {
        let mut rows = Vec::new();
        for item in self.watches.iter() {
            let (key, value) = item?;
            let record = WatchRecord::decode(&value)?;
            rows.push(WatchRow {
                dir: codec::decode_dir(&key),
                label: record.label,
                last_write: record.last_write,
            });
        }
        Ok(rows)
    }

    fn read_ticks(&self, start: Timestamp, end: Timestamp) -> Result<Vec<TickRow>> {
        if start > end {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        for item in self.ticks.range(codec::tick_key(start)..=codec::tick_key(end)) {
            let (key, value) = item?;
            rows.push(TickRow {
                time: codec::decode_tick_key(&key)?,
                label: String::from_utf8_lossy(&value).into_owned(),
            });
        }
        Ok(rows)
    }

    fn put_watch(&self, dir: &Path, label: &str, now: Timestamp) -> Result<()> {
        let record = WatchRecord {
            label: label.to_string(),
            last_write: now,
        };
        self.watches.insert(codec::dir_key(dir), record.encode()?)?;
        self.sync()
    }

    fn remove_watch(&self, dir: &Path) -> Result<bool> {
        let removed = self.watches.remove(codec::dir_key(dir))?.is_some();
        self.sync()?;
        Ok(removed)
    }

    fn evict(&self, max: usize) -> Result<Vec<WatchRow>> {
        let mut rows = self.read_watches()?;
        if rows.len() <= max {
            return Ok(Vec::new());
        }

        // Oldest last write first; dir breaks ties so eviction is deterministic
        rows.sort_by(|a, b| {
            a.last_write
                .cmp(&b.last_write)
                .then_with(|| a.dir.as_os_str().cmp(b.dir.as_os_str()))
        });
        rows.truncate(rows.len() - max);

        let mut batch = Batch::default();
        for row in &rows {
            batch.remove(codec::dir_key(&row.dir));
        }
        self.watches.apply_batch(batch)?;
        self.sync()?;

        debug!(evicted = rows.len(), max, "evicted least recently written watches");
        Ok(rows)
    }

    fn wipe(&self) -> Result<()> {
        self.ticks.clear()?;
        self.watches.clear()?;
        self.sync()
    }
}

/// Set a watch's last write inside a transaction, aborting if it is gone
fn touch_watch(
    watches: &TransactionalTree,
    dir: &Path,
    time: Timestamp,
) -> ConflictableTransactionResult<(), JournalError> {
    let key = codec::dir_key(dir);
    let Some(raw) = watches.get(key)? else {
        return Err(ConflictableTransactionError::Abort(JournalError::UnknownWatch(
            dir.to_path_buf(),
        )));
    };

    let mut record = WatchRecord::decode(&raw).map_err(ConflictableTransactionError::Abort)?;
    record.last_write = time;
    let encoded = record.encode().map_err(ConflictableTransactionError::Abort)?;
    watches.insert(key, encoded)?;
    Ok(())
}

impl Repository for Journal {
    fn insert_tick_if_absent(&self, time: Timestamp, label: &str) -> StoreResult<()> {
        Ok(self.put_tick(time, label)?)
    }

    fn update_last_write(&self, dir: &Path, time: Timestamp) -> StoreResult<()> {
        Ok(self.touch(dir, time)?)
    }

    fn record_activity(&self, dir: &Path, label: &str, time: Timestamp) -> StoreResult<()> {
        Ok(self.record(dir, label, time)?)
    }

    fn list_watches(&self) -> StoreResult<Vec<WatchRow>> {
        Ok(self.read_watches()?)
    }

    fn list_ticks(&self, start: Timestamp, end: Timestamp) -> StoreResult<Vec<TickRow>> {
        Ok(self.read_ticks(start, end)?)
    }

    fn upsert_watch(&self, dir: &Path, label: &str, now: Timestamp) -> StoreResult<()> {
        Ok(self.put_watch(dir, label, now)?)
    }

    fn delete_watch(&self, dir: &Path) -> StoreResult<bool> {
        Ok(self.remove_watch(dir)?)
    }

    fn evict_oldest_watches(&self, max: usize) -> StoreResult<Vec<WatchRow>> {
        Ok(self.evict(max)?)
    }

    fn clear(&self) -> StoreResult<()> {
        Ok(self.wipe()?)
    }

    fn tick_count(&self) -> StoreResult<usize> {
        Ok(self.ticks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tt_core::StoreError;

    fn journal() -> Journal {
        Journal::temporary().unwrap()
    }

    #[test]
    fn test_duplicate_tick_is_ignored() {
        let journal = journal();
        journal.insert_tick_if_absent(100, "first").unwrap();
        journal.insert_tick_if_absent(100, "second").unwrap();

        assert_eq!(journal.list_ticks(0, 1_000).unwrap(), vec![TickRow::new(100, "first")]);
    }

    #[test]
    fn test_list_ticks_range_is_inclusive_and_sorted() {
        let journal = journal();
        for t in [50, 10, 40, 20, 30] {
            journal.insert_tick_if_absent(t, "work").unwrap();
        }

        let times: Vec<i64> = journal
            .list_ticks(20, 40)
            .unwrap()
            .into_iter()
            .map(|t| t.time)
            .collect();
        assert_eq!(times, vec![20, 30, 40]);
        assert!(journal.list_ticks(41, 10).unwrap().is_empty());
    }

    #[test]
    fn test_watches_sorted_by_dir_bytes() {
        let journal = journal();
        // component order would put /a/b first; byte order puts /a-b first
        journal.upsert_watch(Path::new("/a/b"), "ab", 1).unwrap();
        journal.upsert_watch(Path::new("/a-b"), "a-b", 2).unwrap();
        journal.upsert_watch(Path::new("/0"), "zero", 3).unwrap();

        let dirs: Vec<PathBuf> = journal
            .list_watches()
            .unwrap()
            .into_iter()
            .map(|w| w.dir)
            .collect();
        assert_eq!(
            dirs,
            vec![PathBuf::from("/0"), PathBuf::from("/a-b"), PathBuf::from("/a/b")]
        );
    }

    #[test]
    fn test_record_activity_updates_both_trees() {
        let journal = journal();
        journal.upsert_watch(Path::new("/src"), "code", 10).unwrap();
        journal.record_activity(Path::new("/src"), "code", 99).unwrap();

        assert_eq!(journal.list_ticks(0, 100).unwrap(), vec![TickRow::new(99, "code")]);
        assert_eq!(journal.list_watches().unwrap()[0].last_write, 99);
    }

    #[test]
    fn test_record_activity_for_missing_watch_rolls_back() {
        let journal = journal();
        let err = journal
            .record_activity(Path::new("/gone"), "code", 99)
            .unwrap_err();

        assert!(matches!(err, StoreError::UnknownWatch(ref dir) if dir == Path::new("/gone")));
        assert!(journal.list_ticks(0, 100).unwrap().is_empty());
    }

    #[test]
    fn test_record_activity_keeps_existing_tick() {
        let journal = journal();
        journal.upsert_watch(Path::new("/src"), "code", 10).unwrap();
        journal.insert_tick_if_absent(99, "manual").unwrap();
        journal.record_activity(Path::new("/src"), "code", 99).unwrap();

        assert_eq!(journal.list_ticks(0, 100).unwrap(), vec![TickRow::new(99, "manual")]);
        assert_eq!(journal.list_watches().unwrap()[0].last_write, 99);
    }

    #[test]
    fn test_evict_oldest_watches() {
        let journal = journal();
        journal.upsert_watch(Path::new("/b"), "b", 30).unwrap();
        journal.upsert_watch(Path::new("/a"), "a", 10).unwrap();
        journal.upsert_watch(Path::new("/c"), "c", 20).unwrap();

        assert!(journal.evict_oldest_watches(3).unwrap().is_empty());

        let evicted = journal.evict_oldest_watches(1).unwrap();
        let evicted: Vec<&str> = evicted.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(evicted, vec!["a", "c"]);

        let remaining = journal.list_watches().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].dir, PathBuf::from("/b"));
    }

    #[test]
    fn test_update_last_write_unknown_watch() {
        let journal = journal();
        assert!(matches!(
            journal.update_last_write(Path::new("/nope"), 5),
            Err(StoreError::UnknownWatch(_))
        ));
    }

    #[test]
    fn test_delete_and_clear() {
        let journal = journal();
        journal.upsert_watch(Path::new("/a"), "a", 1).unwrap();
        journal.insert_tick_if_absent(1, "a").unwrap();

        assert!(journal.delete_watch(Path::new("/a")).unwrap());
        assert!(!journal.delete_watch(Path::new("/a")).unwrap());

        journal.upsert_watch(Path::new("/b"), "b", 1).unwrap();
        journal.clear().unwrap();
        assert!(journal.list_watches().unwrap().is_empty());
        assert_eq!(journal.tick_count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        {
            let journal = Journal::open(temp_dir.path()).unwrap();
            journal.upsert_watch(Path::new("/src"), "code", 7).unwrap();
            journal.insert_tick_if_absent(7, "code").unwrap();
        }

        let journal = Journal::open(temp_dir.path()).unwrap();
        assert_eq!(journal.list_watches().unwrap()[0].label, "code");
        assert_eq!(journal.tick_count().unwrap(), 1);
    }
}
