//! Named cache stores mapping request identity to response snapshots.
//!
//! The worker only talks to the [`CacheStorage`] and [`Cache`] traits. Two
//! backends are provided:
//!
//! - [`CacheDb`]: persistent SQLite storage via tokio-rusqlite (WAL mode,
//!   versioned migrations, cascade delete of a store's entries)
//! - [`MemoryCacheStorage`]: in-process storage for tests and embedders
//!
//! Stores are insert/overwrite only; entries are never modified in place and
//! are only removed by deleting the whole store.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use crate::Error;
use crate::http::{Request, Response};

pub use connection::CacheDb;
pub use entries::SqliteCache;
pub use memory::{MemoryCache, MemoryCacheStorage};

/// A response snapshot read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub response: Response,
    /// When the snapshot was written.
    pub stored_at: DateTime<Utc>,
}

/// Handle to one named store, valid for the duration of a single operation.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Name the handle was opened with.
    fn name(&self) -> &str;

    /// Look up the stored snapshot for a request.
    async fn get(&self, request: &Request) -> Result<Option<CachedEntry>, Error>;

    /// Store a response for a request, replacing any previous entry.
    ///
    /// Fails with [`Error::NotCacheable`] for anything but GET.
    async fn put(&self, request: &Request, response: Response) -> Result<(), Error>;

    /// Number of entries currently held.
    async fn count(&self) -> Result<u64, Error>;

    /// URLs of the stored requests, oldest first.
    async fn urls(&self) -> Result<Vec<String>, Error>;
}

/// The set of named stores for one origin.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store by name, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, Error>;

    /// Names of all existing stores in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and all its entries. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Whether a store with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.keys().await?.iter().any(|k| k == name))
    }
}

/// Rejects writes the store contract does not allow.
pub(crate) fn ensure_cacheable(request: &Request) -> Result<(), Error> {
    if request.is_get() {
        Ok(())
    } else {
        Err(Error::NotCacheable(format!("{} {}", request.method, request.url)))
    }
}
