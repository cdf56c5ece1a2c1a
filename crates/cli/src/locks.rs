//! Lock file management for daemon exclusivity
//!
//! The daemon holds an exclusive `flock` on `<data_dir>/daemon.lock` for its
//! whole lifetime. The kernel drops the lock when the process dies, so a
//! file left behind by a crash is simply reclaimed by the next daemon.

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::fcntl::{flock, FlockArg};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "daemon.lock";

/// Held daemon lock; released on drop
pub struct DaemonLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Who holds the lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    /// Unix seconds
    pub started_at: i64,
}

impl DaemonLock {
    /// Acquire the daemon lock in `data_dir`
    ///
    /// Fails if another live daemon holds it.
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;
        let path = data_dir.join(LOCK_FILE);

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .context("Failed to open lock file")?;

        if !try_lock(&file)? {
            let holder = read_info(&mut file)
                .map(|info| format!("pid {}", info.pid))
                .unwrap_or_else(|_| "unknown pid".to_string());
            anyhow::bail!("Daemon already running ({})", holder);
        }

        let info = LockInfo {
            pid: std::process::id(),
            started_at: chrono::Utc::now().timestamp(),
        };
        write_info(&mut file, &info)?;

        Ok(Self { path, file })
    }

    /// Release the lock and remove the file
    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }

    /// Report the running daemon, if any, without disturbing it
    pub fn probe(data_dir: &Path) -> Result<Option<LockInfo>> {
        let path = data_dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to open lock file"),
        };

        if try_lock(&file)? {
            // nobody holds it; our lock goes away with `file`
            return Ok(None);
        }

        match read_info(&mut file) {
            Ok(info) if is_process_alive(info.pid) => Ok(Some(info)),
            Ok(_) => Ok(None),
            // the daemon may be mid-write; report it without details
            Err(_) => Ok(Some(LockInfo {
                pid: 0,
                started_at: 0,
            })),
        }
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to take an exclusive lock without blocking
fn try_lock(file: &File) -> Result<bool> {
    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(()) => Ok(true),
        Err(Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e).context("flock failed"),
    }
}

fn write_info(file: &mut File, info: &LockInfo) -> Result<()> {
    let serialized = serde_json::to_string(info).context("Failed to serialize lock content")?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_info(file: &mut File) -> Result<LockInfo> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to deserialize lock content")
}

/// Check a process exists (signal 0 probes without delivering anything)
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        // EPERM: it exists but belongs to someone else
        Err(_) => true,
    }
}
