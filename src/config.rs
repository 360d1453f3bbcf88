use std::path::PathBuf;
use std::time::Duration;

use crate::sentinel::SentinelKind;

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the backing file. Two sentinel paths are derived from it by
    /// suffixing `_request` and `_lock`.
    pub path: PathBuf,

    /// How often the ownership task checks whether another process has
    /// requested the file (default: 50ms). Kept shorter than the
    /// persistence interval so contention resolves faster than data is
    /// flushed.
    pub ownership_interval: Duration,

    /// How often dirty in-memory state is flushed to disk (default: 500ms)
    pub persistence_interval: Duration,

    /// Age after which an existing sentinel is considered orphaned by a
    /// crashed owner and may be removed by a waiting acquirer
    /// (default: 30s)
    pub sentinel_stale_after: Duration,

    /// Filesystem primitive used for the sentinels (default: Directory)
    pub sentinel_kind: SentinelKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./batonkv.db"),
            ownership_interval: Duration::from_millis(50),
            persistence_interval: Duration::from_millis(500),
            sentinel_stale_after: Duration::from_secs(30),
            sentinel_kind: SentinelKind::Directory,
        }
    }
}

impl StoreConfig {
    /// Create a new config with the given backing file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the ownership check interval
    pub fn ownership_interval(mut self, interval: Duration) -> Self {
        self.ownership_interval = interval;
        self
    }

    /// Set the persistence flush interval
    pub fn persistence_interval(mut self, interval: Duration) -> Self {
        self.persistence_interval = interval;
        self
    }

    /// Set the sentinel staleness threshold
    pub fn sentinel_stale_after(mut self, age: Duration) -> Self {
        self.sentinel_stale_after = age;
        self
    }

    /// Set the sentinel strategy
    pub fn sentinel_kind(mut self, kind: SentinelKind) -> Self {
        self.sentinel_kind = kind;
        self
    }

    pub(crate) fn request_path(&self) -> PathBuf {
        suffixed(&self.path, "_request")
    }

    pub(crate) fn lock_path(&self) -> PathBuf {
        suffixed(&self.path, "_lock")
    }
}

fn suffixed(path: &std::path::Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
