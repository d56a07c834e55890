//! Cross-process sync lock.
//!
//! A JSON lock file at `<workdir>/.yep-mem/sync.lock` holds `{pid, ts}`.
//! A present lock is stale when the record is older than five minutes or
//! its process is gone; stale and corrupt locks are overwritten. Release
//! only removes a lock this process wrote.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Lock directory under the workdir.
const LOCK_DIR: &str = ".yep-mem";
/// Lock file name.
const LOCK_FILE: &str = "sync.lock";
/// A lock older than this is stale regardless of its process.
const STALE_AFTER_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockRecord {
    pid: u32,
    /// Unix millis at acquisition
    ts: i64,
}

/// File-based mutex guaranteeing at most one ingest per workdir.
#[derive(Debug, Clone)]
pub struct SyncLock {
    path: PathBuf,
}

impl SyncLock {
    pub fn new(workdir: &Path) -> Self {
        Self {
            path: workdir.join(LOCK_DIR).join(LOCK_FILE),
        }
    }

    /// Lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to take the lock. Returns false when a live holder exists.
    pub fn acquire(&self) -> Result<bool> {
        if let Some(record) = self.read_record() {
            if !is_stale(&record) {
                debug!("Lock held by live pid {}", record.pid);
                return Ok(false);
            }
            warn!(
                "Overwriting stale lock (pid {}, age {}ms)",
                record.pid,
                Utc::now().timestamp_millis() - record.ts
            );
        }
        self.write_record()?;
        Ok(true)
    }

    /// Remove the lock if this process owns it.
    pub fn release(&self) -> Result<()> {
        let Some(record) = self.read_record() else {
            return Ok(());
        };
        if record.pid != std::process::id() {
            debug!("Not releasing lock owned by pid {}", record.pid);
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a live holder currently exists.
    pub fn is_held(&self) -> bool {
        self.read_record().map(|r| !is_stale(&r)).unwrap_or(false)
    }

    /// Run `f` under the lock; fails fast with [`IngestError::LockBusy`]
    /// and releases on every exit path.
    pub async fn with_lock<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if !self.acquire()? {
            return Err(IngestError::LockBusy);
        }
        let result = f().await;
        if let Err(e) = self.release() {
            warn!("Failed to release lock: {}", e);
        }
        result
    }

    /// Parse the lock file; unreadable or corrupt files read as absent
    /// (and therefore stale).
    fn read_record(&self) -> Option<LockRecord> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Treating corrupt lock file as stale: {}", e);
                None
            }
        }
    }

    fn write_record(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let record = LockRecord {
            pid: std::process::id(),
            ts: Utc::now().timestamp_millis(),
        };
        std::fs::write(&self.path, serde_json::to_string(&record)?)?;
        Ok(())
    }
}

fn is_stale(record: &LockRecord) -> bool {
    let age = Utc::now().timestamp_millis() - record.ts;
    age > STALE_AFTER_MS || !process_alive(record.pid)
}

/// Signal-0 probe on unix; other platforms assume the process is alive and
/// rely on the age check alone.
#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    // kill(pid, 0) checks existence without sending a signal; EPERM still
    // means the process exists
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
    result == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
