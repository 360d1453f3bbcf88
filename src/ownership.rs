//! Cross-process ownership of the backing file.
//!
//! Exactly one process at a time may hold the backing file open and mutate
//! the in-memory mirror. Ownership is gated by an exclusively-created lock
//! sentinel; a second, short-lived request sentinel announces a waiting
//! process so the current owner can yield early instead of waiting for a
//! timeout. The handoff is the only cross-process synchronization point:
//! state is decoded on acquire and flushed on yield.

use std::io::SeekFrom;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::codec::{self, StateMap};
use crate::error::{Error, Result};
use crate::sentinel::Sentinel;
use crate::store::StoreInner;

/// Where this process stands with respect to the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OwnershipState {
    Unowned,
    /// Request sentinel held, waiting for the lock sentinel.
    Requesting,
    Owned,
}

/// Everything behind the store mutex. A single mutex serializes all
/// operations and tick bodies within the process, so a tick can never
/// interleave with a half-applied mutation or double-flush.
pub(crate) struct Shared {
    pub ownership: OwnershipState,
    pub file: Option<tokio::fs::File>,
    pub state: StateMap,
    pub dirty: bool,
    pub active: bool,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            ownership: OwnershipState::Unowned,
            file: None,
            state: StateMap::new(),
            dirty: false,
            active: true,
        }
    }

    pub fn owned(&self) -> bool {
        self.ownership == OwnershipState::Owned
    }
}

/// Make sure this process owns the backing file, acquiring it if needed.
/// No-op when already owned.
pub(crate) async fn ensure_owned(inner: &StoreInner, shared: &mut Shared) -> Result<()> {
    if !shared.active {
        return Err(Error::Shutdown);
    }
    if shared.owned() {
        return Ok(());
    }

    // Announce interest first. The current owner polls for this sentinel
    // and yields, which keeps the wait for the lock sentinel short.
    acquire_sentinel(inner, &inner.request).await?;
    shared.ownership = OwnershipState::Requesting;

    if let Err(e) = acquire_sentinel(inner, &inner.lock).await {
        let _ = inner.request.release().await;
        shared.ownership = OwnershipState::Unowned;
        return Err(e);
    }

    if let Err(e) = inner.request.release().await {
        let _ = inner.lock.release().await;
        shared.ownership = OwnershipState::Unowned;
        return Err(e.into());
    }

    match read_state(inner).await {
        Ok((file, state)) => {
            shared.file = Some(file);
            shared.state = state;
            shared.dirty = false;
            shared.ownership = OwnershipState::Owned;
            tracing::debug!(path = %inner.config.path.display(), "acquired backing file");
            Ok(())
        }
        Err(e) => {
            let _ = inner.lock.release().await;
            shared.ownership = OwnershipState::Unowned;
            Err(e)
        }
    }
}

/// Open the backing file (creating it if absent, never truncating) and
/// decode its contents. This is where a process picks up state written by
/// the previous owner; the decoded mapping replaces the local one.
async fn read_state(inner: &StoreInner) -> Result<(tokio::fs::File, StateMap)> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&inner.config.path)
        .await?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).await?;
    let state = codec::decode(&contents)?;
    Ok((file, state))
}

/// Retry sentinel creation until it succeeds. Contention backs off by a
/// third of the ownership interval; sentinels orphaned by a dead owner are
/// broken once they pass the staleness threshold. The loop is unbounded:
/// a caller wanting a timeout imposes one externally.
async fn acquire_sentinel(inner: &StoreInner, sentinel: &Sentinel) -> Result<()> {
    let backoff = inner.config.ownership_interval / 3;
    loop {
        if sentinel.try_acquire().await? {
            return Ok(());
        }
        if sentinel.break_stale(inner.config.sentinel_stale_after).await? {
            continue;
        }
        tokio::time::sleep(backoff).await;
    }
}

/// Rewrite the whole file from the in-memory mapping if it has unflushed
/// mutations. The dirty flag clears only after a successful write.
pub(crate) async fn flush(shared: &mut Shared) -> Result<()> {
    if !shared.dirty {
        return Ok(());
    }
    let Some(file) = shared.file.as_mut() else {
        return Ok(());
    };
    let encoded = codec::encode(&shared.state);
    file.set_len(0).await?;
    file.seek(SeekFrom::Start(0)).await?;
    file.write_all(encoded.as_bytes()).await?;
    file.flush().await?;
    shared.dirty = false;
    Ok(())
}

/// Flush, close the handle, and hand the file to the next acquirer.
pub(crate) async fn yield_ownership(inner: &StoreInner, shared: &mut Shared) -> Result<()> {
    if !shared.owned() {
        return Ok(());
    }
    flush(shared).await?;
    shared.file = None;
    inner.lock.release().await?;
    shared.ownership = OwnershipState::Unowned;
    tracing::debug!(path = %inner.config.path.display(), "yielded backing file");
    Ok(())
}
