//! TTL locks built on ordinary key-value storage.
//!
//! A lock is just a key whose value is an absolute expiry timestamp in
//! milliseconds since the epoch. The key is locked while that number is
//! strictly greater than the current time; absence, a non-number, or an
//! expired number all mean unlocked, so an abandoned lock frees itself
//! once its timestamp passes.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::ownership;
use crate::store::{check_key, Store};
use crate::value::Value;

/// Default maximum hold time for a lock.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);

/// Default wait between claim attempts of a contended lock.
pub const DEFAULT_LOCK_RETRY: Duration = Duration::from_millis(10);

impl Store {
    /// Lock `key` with default TTL and retry interval.
    ///
    /// See [`Store::lock_with`].
    pub async fn lock(&self, key: &str) -> Result<u64> {
        self.lock_with(key, DEFAULT_LOCK_TTL, DEFAULT_LOCK_RETRY).await
    }

    /// Lock `key`, waiting for the current holder if there is one.
    ///
    /// Returns the lock's expiry timestamp in ms since the epoch; the
    /// caller must keep it and pass it back to [`Store::unlock`]. While the
    /// key is held, claim attempts are retried every
    /// `min(remaining hold time, retry_interval)`.
    pub async fn lock_with(
        &self,
        key: &str,
        max_ttl: Duration,
        retry_interval: Duration,
    ) -> Result<u64> {
        check_key(key)?;
        loop {
            let wait = {
                let mut shared = self.inner.shared.lock().await;
                ownership::ensure_owned(&self.inner, &mut shared).await?;
                let now = now_millis();
                match current_expiry(shared.state.get(key), now) {
                    Some(expiry) => remaining(expiry, now).min(retry_interval),
                    None => {
                        let expiry = now + max_ttl.as_millis() as u64;
                        shared.state.insert(key.to_string(), Value::Number(expiry as f64));
                        shared.dirty = true;
                        return Ok(expiry);
                    }
                }
            };
            // Mutex released while waiting, so ticks and other callers
            // keep running.
            tokio::time::sleep(wait).await;
        }
    }

    /// Lock `key` with the default TTL, failing instead of waiting.
    pub async fn try_lock(&self, key: &str) -> Result<u64> {
        self.try_lock_with(key, DEFAULT_LOCK_TTL).await
    }

    /// Lock `key`, failing with [`Error::AlreadyLocked`] if an unexpired
    /// holder exists. Returns the expiry timestamp on success.
    pub async fn try_lock_with(&self, key: &str, max_ttl: Duration) -> Result<u64> {
        check_key(key)?;
        let mut shared = self.inner.shared.lock().await;
        ownership::ensure_owned(&self.inner, &mut shared).await?;
        let now = now_millis();
        if let Some(expiry) = current_expiry(shared.state.get(key), now) {
            return Err(Error::AlreadyLocked {
                key: key.to_string(),
                until: expiry as u64,
            });
        }
        let expiry = now + max_ttl.as_millis() as u64;
        shared.state.insert(key.to_string(), Value::Number(expiry as f64));
        shared.dirty = true;
        Ok(expiry)
    }

    /// Release `key` only if it still holds the expiry this caller was
    /// given. The compare guards against deleting a lock someone else
    /// re-acquired after ours expired.
    pub async fn unlock(&self, key: &str, expected_expiry: u64) -> Result<()> {
        let mut shared = self.inner.shared.lock().await;
        ownership::ensure_owned(&self.inner, &mut shared).await?;
        if let Some(Value::Number(n)) = shared.state.get(key) {
            if *n == expected_expiry as f64 {
                shared.state.remove(key);
                shared.dirty = true;
            }
        }
        Ok(())
    }
}

/// The unexpired expiry at this value, if any. NaN compares false and so
/// counts as unlocked.
fn current_expiry(value: Option<&Value>, now: u64) -> Option<f64> {
    match value {
        Some(Value::Number(n)) if *n > now as f64 => Some(*n),
        _ => None,
    }
}

fn remaining(expiry: f64, now: u64) -> Duration {
    Duration::from_millis((expiry - now as f64).ceil() as u64)
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as u64
}
