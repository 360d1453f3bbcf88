//! Filesystem sentinels: mutual exclusion from atomic create operations.
//!
//! A sentinel is a filesystem object whose exclusive creation decides
//! ownership. Two strategies are supported: an atomically-created
//! directory, and an exclusively-created file (which records the owning
//! pid for debugging). Both remove idempotently, so releasing an
//! already-gone sentinel is not an error.
//!
//! A crashed owner leaves its sentinel behind. Waiters treat a sentinel
//! older than the configured staleness threshold as orphaned and may
//! remove it, which bounds how long a crash can block acquisition.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::AsyncWriteExt;

/// Which filesystem primitive backs a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelKind {
    /// `mkdir`: creation fails with `AlreadyExists` when contended.
    Directory,
    /// `O_CREAT | O_EXCL` file; the owner's pid is written into it.
    File,
}

/// An exclusively-creatable filesystem resource.
pub struct Sentinel {
    path: PathBuf,
    kind: SentinelKind,
    held: AtomicBool,
}

impl Sentinel {
    pub fn new(path: impl Into<PathBuf>, kind: SentinelKind) -> Self {
        Self {
            path: path.into(),
            kind,
            held: AtomicBool::new(false),
        }
    }

    /// Attempt to create the sentinel exclusively.
    ///
    /// Returns `Ok(true)` when acquired, `Ok(false)` when another holder
    /// already has it. Any failure other than `AlreadyExists` is fatal.
    pub async fn try_acquire(&self) -> io::Result<bool> {
        let outcome = match self.kind {
            SentinelKind::Directory => tokio::fs::create_dir(&self.path).await,
            SentinelKind::File => self.create_pid_file().await,
        };
        match outcome {
            Ok(()) => {
                self.held.store(true, Ordering::SeqCst);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_pid_file(&self) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", std::process::id()).as_bytes())
            .await?;
        file.flush().await
    }

    /// Remove the sentinel. Removing one that is already gone succeeds.
    pub async fn release(&self) -> io::Result<()> {
        self.held.store(false, Ordering::SeqCst);
        let result = match self.kind {
            SentinelKind::Directory => tokio::fs::remove_dir(&self.path).await,
            SentinelKind::File => tokio::fs::remove_file(&self.path).await,
        };
        match result {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Synchronous best-effort removal for teardown paths that cannot
    /// await. Failures are logged and swallowed.
    pub fn release_blocking(&self) {
        self.held.store(false, Ordering::SeqCst);
        let result = match self.kind {
            SentinelKind::Directory => std::fs::remove_dir(&self.path),
            SentinelKind::File => std::fs::remove_file(&self.path),
        };
        if let Err(e) = result {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "sentinel cleanup failed");
            }
        }
    }

    /// Whether this process currently holds the sentinel.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Whether the sentinel exists on disk, regardless of who created it.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Remove the sentinel if its mtime is older than `age`, indicating an
    /// owner that died without releasing. Returns true when removed.
    pub async fn break_stale(&self, age: Duration) -> io::Result<bool> {
        if !self.is_stale(age).await {
            return Ok(false);
        }
        tracing::warn!(path = %self.path.display(), "removing stale sentinel left by a dead owner");
        self.release().await?;
        Ok(true)
    }

    async fn is_stale(&self, age: Duration) -> bool {
        let Ok(meta) = tokio::fs::metadata(&self.path).await else {
            return false;
        };
        meta.modified()
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .map(|elapsed| elapsed > age)
            .unwrap_or(false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmpfs::TempPath;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let tmp = TempPath::new();
        let sentinel = Sentinel::new(tmp.path(), SentinelKind::Directory);

        assert!(sentinel.try_acquire().await.unwrap());
        assert!(sentinel.is_held());
        assert!(sentinel.exists().await);

        sentinel.release().await.unwrap();
        assert!(!sentinel.is_held());
        assert!(!sentinel.exists().await);
    }

    #[tokio::test]
    async fn test_second_acquire_is_contention() {
        let tmp = TempPath::new();
        let first = Sentinel::new(tmp.path(), SentinelKind::Directory);
        let second = Sentinel::new(tmp.path(), SentinelKind::Directory);

        assert!(first.try_acquire().await.unwrap());
        assert!(!second.try_acquire().await.unwrap());
        assert!(!second.is_held());

        first.release().await.unwrap();
        assert!(second.try_acquire().await.unwrap());
        second.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let tmp = TempPath::new();
        let sentinel = Sentinel::new(tmp.path(), SentinelKind::File);

        assert!(sentinel.try_acquire().await.unwrap());
        sentinel.release().await.unwrap();
        // Already gone, still fine
        sentinel.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_sentinel_records_pid() {
        let tmp = TempPath::new();
        let sentinel = Sentinel::new(tmp.path(), SentinelKind::File);

        assert!(sentinel.try_acquire().await.unwrap());
        let contents = tokio::fs::read_to_string(tmp.path()).await.unwrap();
        assert!(contents.contains(&std::process::id().to_string()));
        sentinel.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_break_stale_removes_old_sentinel() {
        let tmp = TempPath::new();
        let orphan = Sentinel::new(tmp.path(), SentinelKind::Directory);
        assert!(orphan.try_acquire().await.unwrap());

        let waiter = Sentinel::new(tmp.path(), SentinelKind::Directory);
        // Fresh sentinel stays put
        assert!(!waiter.break_stale(Duration::from_secs(60)).await.unwrap());
        // With a zero threshold the same sentinel counts as orphaned
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(waiter.break_stale(Duration::ZERO).await.unwrap());
        assert!(waiter.try_acquire().await.unwrap());
        waiter.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_break_stale_ignores_missing_sentinel() {
        let tmp = TempPath::new();
        let sentinel = Sentinel::new(tmp.path(), SentinelKind::Directory);
        assert!(!sentinel.break_stale(Duration::ZERO).await.unwrap());
    }
}
