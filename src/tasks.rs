//! The store's two periodic tasks.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::ownership;
use crate::scheduler::BackgroundTask;
use crate::store::StoreInner;

/// Flushes dirty state to disk on a fixed cadence while the file is owned.
pub(crate) struct PersistenceTask {
    inner: Arc<StoreInner>,
}

impl PersistenceTask {
    pub fn new(inner: Arc<StoreInner>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl BackgroundTask for PersistenceTask {
    fn name(&self) -> &'static str {
        "persistence"
    }

    fn interval(&self) -> Duration {
        self.inner.config.persistence_interval
    }

    async fn tick(&self) -> Result<()> {
        let mut shared = self.inner.shared.lock().await;
        if !shared.active || !shared.owned() {
            return Ok(());
        }
        ownership::flush(&mut shared).await
    }
}

/// Yields the backing file when another process has signalled a request.
pub(crate) struct OwnershipTask {
    inner: Arc<StoreInner>,
}

impl OwnershipTask {
    pub fn new(inner: Arc<StoreInner>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl BackgroundTask for OwnershipTask {
    fn name(&self) -> &'static str {
        "ownership"
    }

    fn interval(&self) -> Duration {
        self.inner.config.ownership_interval
    }

    async fn tick(&self) -> Result<()> {
        let mut shared = self.inner.shared.lock().await;
        if !shared.active || !shared.owned() {
            return Ok(());
        }
        if self.inner.request.exists().await {
            ownership::yield_ownership(&self.inner, &mut shared).await?;
        }
        Ok(())
    }
}
