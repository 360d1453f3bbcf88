//! Embedded key-value store shared by multiple OS processes through a
//! single backing file, coordinated with filesystem primitives only.
//!
//! # Architecture
//!
//! One process at a time owns the backing file; everyone else waits.
//! Ownership is handed off cooperatively:
//!
//! ```text
//!  process A (owner)                      process B (waiting)
//! ┌──────────────────┐                   ┌──────────────────┐
//! │ in-memory state  │                   │    acquire()     │
//! │   + dirty flag   │                   └────────┬─────────┘
//! └───────┬──────────┘                            │ creates
//!         │ flush on tick / yield                 ▼
//!         ▼                              <path>_request sentinel
//!   backing file  ◄──── lock sentinel ────  (hint to yield)
//!                       <path>_lock
//! ```
//!
//! # Data Flow
//!
//! 1. **Acquire**: create the request sentinel, then the lock sentinel
//!    (both atomic creates, retried on contention); open the backing file
//!    and decode it into memory.
//! 2. **Mutate**: `get`/`set`/`delete` work on the in-memory mirror;
//!    mutations set the dirty flag.
//! 3. **Flush**: the persistence task rewrites the whole file on a fixed
//!    interval while state is dirty.
//! 4. **Yield**: the ownership task watches for a request sentinel and
//!    hands the file off (flush, close, remove lock sentinel).
//!
//! # Concurrency
//!
//! - Within a process, one mutex serializes every operation and tick.
//! - Across processes, the lock sentinel guarantees a single owner; the
//!   handoff (decode on acquire, flush on yield) is the only
//!   synchronization point, so reads see another process's writes no
//!   sooner than one flush-and-yield cycle.
//! - TTL locks layer application-level mutual exclusion over plain
//!   values: a lock is a key holding its expiry timestamp.
//!
//! # Example
//!
//! ```rust,no_run
//! use batonkv::{Store, Value};
//!
//! #[tokio::main]
//! async fn main() -> batonkv::Result<()> {
//!     let store = Store::open("/tmp/app.state");
//!
//!     store.set("count", 42).await?;
//!     assert_eq!(store.get("count").await?, Value::Number(42.0));
//!
//!     let expiry = store.lock("migration").await?;
//!     // ... critical section ...
//!     store.unlock("migration", expiry).await?;
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
mod lock;
mod ownership;
mod scheduler;
pub mod sentinel;
pub mod store;
mod tasks;
#[cfg(test)]
mod tmpfs;
pub mod value;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use lock::{DEFAULT_LOCK_RETRY, DEFAULT_LOCK_TTL};
pub use sentinel::SentinelKind;
pub use store::Store;
pub use value::Value;
