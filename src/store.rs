//! Public store API.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::ownership::{self, Shared};
use crate::scheduler::Scheduler;
use crate::sentinel::Sentinel;
use crate::tasks::{OwnershipTask, PersistenceTask};
use crate::value::Value;

/// State shared between the public API and the background tasks.
pub(crate) struct StoreInner {
    pub config: StoreConfig,
    pub request: Sentinel,
    pub lock: Sentinel,
    pub shared: Mutex<Shared>,
}

/// An embedded key-value store shared across processes through a single
/// backing file.
///
/// Every operation first makes sure this process owns the file (a no-op
/// once owned); mutations only touch the in-memory mirror and are flushed
/// by the persistence task, so durability is eventual, bounded by the
/// persistence interval.
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
    scheduler: Mutex<Option<Scheduler>>,
}

impl Store {
    /// Open a store on the given backing file with default configuration.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_config(StoreConfig::new(path))
    }

    /// Open a store with custom configuration.
    ///
    /// Must be called from within a tokio runtime; the two background
    /// tasks are spawned here. The backing file itself is untouched until
    /// the first operation acquires it.
    pub fn open_with_config(config: StoreConfig) -> Self {
        let request = Sentinel::new(config.request_path(), config.sentinel_kind);
        let lock = Sentinel::new(config.lock_path(), config.sentinel_kind);
        let inner = Arc::new(StoreInner {
            config,
            request,
            lock,
            shared: Mutex::new(Shared::new()),
        });

        let mut scheduler = Scheduler::new();
        scheduler.register(Arc::new(OwnershipTask::new(inner.clone())));
        scheduler.register(Arc::new(PersistenceTask::new(inner.clone())));

        Self {
            inner,
            scheduler: Mutex::new(Some(scheduler)),
        }
    }

    /// Read the value at `key`. A missing key reads as [`Value::Absent`].
    pub async fn get(&self, key: &str) -> Result<Value> {
        let mut shared = self.inner.shared.lock().await;
        ownership::ensure_owned(&self.inner, &mut shared).await?;
        Ok(shared.state.get(key).cloned().unwrap_or(Value::Absent))
    }

    /// Write `value` at `key`. The mutation is in-memory only until the
    /// next persistence tick or yield.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        check_key(&key)?;
        let mut shared = self.inner.shared.lock().await;
        ownership::ensure_owned(&self.inner, &mut shared).await?;
        shared.state.insert(key, value.into());
        shared.dirty = true;
        Ok(())
    }

    /// Remove `key`. Removing a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let mut shared = self.inner.shared.lock().await;
        ownership::ensure_owned(&self.inner, &mut shared).await?;
        shared.state.remove(key);
        shared.dirty = true;
        Ok(())
    }

    /// Stop the background tasks, flush dirty state, and release the
    /// backing file. Further operations fail with [`Error::Shutdown`].
    pub async fn shutdown(&self) -> Result<()> {
        let result = {
            let mut shared = self.inner.shared.lock().await;
            if !shared.active {
                return Ok(());
            }
            shared.active = false;
            ownership::yield_ownership(&self.inner, &mut shared).await
        };
        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.shutdown().await;
        }
        result
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        // Best-effort, like being killed: the lock sentinel is removed so
        // other processes can make progress, but unflushed mutations are
        // lost. The clean path is shutdown().
        if let Ok(mut shared) = self.inner.shared.try_lock() {
            if shared.owned() {
                shared.file = None;
                shared.ownership = crate::ownership::OwnershipState::Unowned;
                self.inner.lock.release_blocking();
            }
        }
    }
}

pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.contains('\n') {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}
