//! In-process cache storage.
//!
//! Same contract as the SQLite backend, held in `tokio::sync::RwLock`-guarded
//! maps. Nothing survives the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Cache, CacheStorage, CachedEntry, ensure_cacheable};
use crate::Error;
use crate::http::{Request, Response};

/// One in-memory store.
#[derive(Debug)]
pub struct MemoryCache {
    name: String,
    /// key hash -> (request url, entry)
    entries: RwLock<HashMap<String, (String, CachedEntry)>>,
}

impl MemoryCache {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), entries: RwLock::new(HashMap::new()) }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, request: &Request) -> Result<Option<CachedEntry>, Error> {
        let entries = self.entries.read().await;
        Ok(entries.get(&request.cache_key()).map(|(_, entry)| entry.clone()))
    }

    async fn put(&self, request: &Request, response: Response) -> Result<(), Error> {
        ensure_cacheable(request)?;
        let entry = CachedEntry { response, stored_at: Utc::now() };
        let mut entries = self.entries.write().await;
        entries.insert(request.cache_key(), (request.url.to_string(), entry));
        Ok(())
    }

    async fn count(&self) -> Result<u64, Error> {
        Ok(self.entries.read().await.len() as u64)
    }

    async fn urls(&self) -> Result<Vec<String>, Error> {
        let entries = self.entries.read().await;
        let mut urls: Vec<_> = entries.values().map(|(url, e)| (e.stored_at, url.clone())).collect();
        urls.sort();
        Ok(urls.into_iter().map(|(_, url)| url).collect())
    }
}

/// In-memory [`CacheStorage`]; stores are kept in creation order.
#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStorage {
    stores: Arc<RwLock<Vec<Arc<MemoryCache>>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, Error> {
        {
            let stores = self.stores.read().await;
            if let Some(store) = stores.iter().find(|s| s.name == name) {
                return Ok(store.clone());
            }
        }

        let mut stores = self.stores.write().await;
        // another open may have raced us between the two locks
        if let Some(store) = stores.iter().find(|s| s.name == name) {
            return Ok(store.clone());
        }
        let store = Arc::new(MemoryCache::new(name));
        stores.push(store.clone());
        Ok(store)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.stores.read().await.iter().map(|s| s.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| s.name != name);
        Ok(stores.len() != before)
    }
}
