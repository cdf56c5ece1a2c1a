//! Recursive watch engine
//!
//! Every directory is registered with inotify *before* it is listed. Anything
//! created after registration produces a kernel event; anything created
//! before it shows up in the listing. Entries seen both ways are reported
//! once: a directory is only announced if it is not already being watched.
//!
//! The engine is single-threaded. A directory's listing (including its
//! subdirectories' listings) completes before the next kernel read, so event
//! order is preserved.

use crate::decode::{mask, EventBuffer, RawRecord};
use crate::error::{is_vanished, WatchError};
use crate::event::{Entry, WatchEvent};
use crate::ignore::NameFilter;
use crate::sys::Inotify;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Kernel events requested for every directory
const WATCH_MASK: u32 = mask::CREATE
    | mask::DELETE
    | mask::MODIFY
    | mask::MOVED_FROM
    | mask::MOVED_TO
    | mask::IGNORED
    | mask::ONLYDIR;

/// Options for `watch`
#[derive(Clone)]
pub struct WatchOptions {
    /// Stop watching (returning `Ok`) once cancelled
    pub cancel: Option<CancellationToken>,
    /// How often cancellation is checked while idle
    pub poll_interval: Duration,
    /// Extra gitignore-style patterns to skip
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            cancel: None,
            poll_interval: Duration::from_secs(1),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Watch `root` recursively, calling `on_event` for every change
///
/// Every entry already under `root` is first reported as a `Create`. Blocks
/// until `on_event` fails, the root is deleted, an unrecoverable error
/// occurs, or the cancellation token fires.
pub fn watch<F>(root: &Path, options: WatchOptions, on_event: F) -> Result<(), WatchError>
where
    F: FnMut(&WatchEvent) -> anyhow::Result<()>,
{
    let root: PathBuf = root.components().collect();

    let meta = fs::metadata(&root).map_err(|e| WatchError::io("stat", &root, e))?;
    if !meta.is_dir() {
        return Err(WatchError::NotADirectory(root));
    }

    let filter = NameFilter::with_patterns(&root, &options.ignore_patterns)?;
    let inotify = Inotify::init().map_err(|e| WatchError::io("inotify_init", &root, e))?;

    let mut engine = Engine {
        root: root.clone(),
        inotify,
        filter,
        wd_to_path: HashMap::new(),
        watched_dirs: HashSet::new(),
        on_event,
    };

    engine.add(&root)?;
    debug!(
        root = %root.display(),
        dirs = engine.watched_dirs.len(),
        "initial scan complete"
    );

    engine.run(options.cancel.as_ref(), options.poll_interval)
}

struct Engine<F> {
    root: PathBuf,
    inotify: Inotify,
    filter: NameFilter,
    /// Watch descriptor -> directory it was registered for
    wd_to_path: HashMap<i32, PathBuf>,
    /// Directories currently watched, used to suppress duplicate creates
    watched_dirs: HashSet<PathBuf>,
    on_event: F,
}

impl<F> Engine<F>
where
    F: FnMut(&WatchEvent) -> anyhow::Result<()>,
{
    fn run(
        &mut self,
        cancel: Option<&CancellationToken>,
        poll_interval: Duration,
    ) -> Result<(), WatchError> {
        let mut buffer = EventBuffer::default();
        let timeout = cancel.map(|_| poll_interval);

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!(root = %self.root.display(), "watch cancelled");
                return Ok(());
            }

            let ready = self
                .inotify
                .wait(timeout)
                .map_err(|e| WatchError::io("poll", &self.root, e))?;
            if !ready {
                continue;
            }

            let n = self
                .inotify
                .read(buffer.spare())
                .map_err(|e| WatchError::io("read", &self.root, e))?;
            if n == 0 {
                continue;
            }
            buffer.commit(n);

            for record in buffer.drain()? {
                self.dispatch(record)?;
            }
        }
    }

    /// Translate one kernel record into an event
    fn dispatch(&mut self, record: RawRecord) -> Result<(), WatchError> {
        if record.has(mask::Q_OVERFLOW) {
            return Err(WatchError::Overflow);
        }

        let Some(dir) = self.wd_to_path.get(&record.wd) else {
            trace!(wd = record.wd, mask = record.mask, "event for released watch dropped");
            return Ok(());
        };

        if record.has(mask::IGNORED) {
            if *dir == self.root {
                return Err(WatchError::RootDeleted(self.root.clone()));
            }
            // the kernel already released this descriptor
            self.wd_to_path.remove(&record.wd);
            return Ok(());
        }

        let path = if record.name.is_empty() {
            dir.clone()
        } else {
            dir.join(&record.name)
        };
        let entry = Entry::new(path, record.has(mask::ISDIR));

        let event = if record.has(mask::CREATE | mask::MOVED_TO) {
            WatchEvent::Create(entry)
        } else if record.has(mask::DELETE | mask::MOVED_FROM) {
            WatchEvent::Delete(entry)
        } else if record.has(mask::MODIFY) {
            WatchEvent::Modify(entry)
        } else {
            return Ok(());
        };

        if self.filter.is_ignored(event.path(), event.is_dir()) {
            return Ok(());
        }
        self.apply(event)
    }

    /// Report an event and update the watch set to match
    fn apply(&mut self, event: WatchEvent) -> Result<(), WatchError> {
        match &event {
            WatchEvent::Create(entry) => {
                if self.watched_dirs.contains(&entry.path) {
                    trace!(path = %entry.path.display(), "duplicate create suppressed");
                    return Ok(());
                }
                self.emit(&event)?;
                if entry.is_dir {
                    self.add(&entry.path)?;
                }
                Ok(())
            }
            WatchEvent::Delete(entry) => {
                if entry.is_dir {
                    self.forget_subtree(&entry.path);
                }
                self.emit(&event)
            }
            WatchEvent::Modify(_) => self.emit(&event),
        }
    }

    fn emit(&mut self, event: &WatchEvent) -> Result<(), WatchError> {
        trace!(%event, "watch event");
        (self.on_event)(event).map_err(WatchError::Callback)
    }

    /// Watch `dir`, then report everything already inside it
    ///
    /// A non-root dir that vanishes midway is skipped silently; its
    /// deletion arrives as a kernel event.
    fn add(&mut self, dir: &Path) -> Result<(), WatchError> {
        let is_root = dir == self.root;

        let wd = match self.inotify.add_watch(dir, WATCH_MASK) {
            Ok(wd) => wd,
            Err(e) if !is_root && is_vanished(&e) => {
                trace!(dir = %dir.display(), "dir vanished before it was watched");
                return Ok(());
            }
            Err(e) => return Err(WatchError::io("inotify_add_watch", dir, e)),
        };
        self.wd_to_path.insert(wd, dir.to_path_buf());
        self.watched_dirs.insert(dir.to_path_buf());

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if !is_root && is_vanished(&e) => return Ok(()),
            Err(e) => return Err(WatchError::io("read_dir", dir, e)),
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if !is_root && is_vanished(&e) => return Ok(()),
                Err(e) => return Err(WatchError::io("read_dir", dir, e)),
            };

            let path = entry.path();
            let is_dir = match entry.file_type() {
                Ok(file_type) => file_type.is_dir(),
                Err(e) if is_vanished(&e) => continue,
                Err(e) => return Err(WatchError::io("stat", &path, e)),
            };

            if self.filter.is_ignored(&path, is_dir) {
                continue;
            }
            self.apply(WatchEvent::Create(Entry::new(path, is_dir)))?;
        }

        Ok(())
    }

    /// Drop `dir` and every watched dir below it
    fn forget_subtree(&mut self, dir: &Path) {
        self.watched_dirs.retain(|watched| !watched.starts_with(dir));

        let released: Vec<i32> = self
            .wd_to_path
            .iter()
            .filter(|(_, path)| path.starts_with(dir))
            .map(|(&wd, _)| wd)
            .collect();

        for wd in released {
            self.wd_to_path.remove(&wd);
            // fails harmlessly if the kernel already dropped it
            if let Err(e) = self.inotify.rm_watch(wd) {
                trace!(wd, error = %e, "rm_watch failed");
            }
        }
    }
}
