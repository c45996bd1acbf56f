//! Test doubles shared by the worker's unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ephone_client::Fetcher;
use ephone_core::{Cache, CacheStorage, CachedEntry, Error, MemoryCacheStorage, Request, Response};
use url::Url;

use crate::host::Host;
use crate::relay::Notification;

/// Ordered record of storage and host calls, shared between doubles.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Fetcher that answers from a fixed table and records every call.
///
/// Unknown URLs answer `404`. When offline, every call fails with a
/// network error.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
    too_large: Mutex<HashSet<String>>,
    offline: AtomicBool,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    /// Answer `url` with a body over the byte limit.
    pub fn route_too_large(&self, url: &str) {
        self.too_large.lock().unwrap().insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.url.to_string());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        if self.too_large.lock().unwrap().contains(request.url.as_str()) {
            return Err(Error::FetchTooLarge(format!("{} exceeds limit", request.url)));
        }

        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "").with_status_text("Not Found")))
    }
}

/// Wraps in-memory storage and fails chosen operations.
///
/// Every delete attempt is written to `journal`.
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemoryCacheStorage,
    pub journal: Journal,
    failing: Mutex<HashSet<String>>,
    put_budget: Arc<Mutex<Option<usize>>>,
}

impl FlakyStorage {
    pub fn fail_delete(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    /// Allow `n` more successful writes across all stores, then fail.
    pub fn fail_puts_after(&self, n: usize) {
        *self.put_budget.lock().unwrap() = Some(n);
    }
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, Error> {
        let inner = self.inner.open(name).await?;
        Ok(Arc::new(FlakyCache { inner, put_budget: self.put_budget.clone() }))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.journal.lock().unwrap().push(format!("delete {name}"));
        if self.failing.lock().unwrap().contains(name) {
            return Err(Error::Corrupt(format!("store {name} is locked")));
        }
        self.inner.delete(name).await
    }
}

struct FlakyCache {
    inner: Arc<dyn Cache>,
    put_budget: Arc<Mutex<Option<usize>>>,
}

#[async_trait]
impl Cache for FlakyCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, request: &Request) -> Result<Option<CachedEntry>, Error> {
        self.inner.get(request).await
    }

    async fn put(&self, request: &Request, response: Response) -> Result<(), Error> {
        {
            let mut budget = self.put_budget.lock().unwrap();
            match budget.as_mut() {
                Some(0) => return Err(Error::Corrupt(format!("disk full writing {}", request.url))),
                Some(n) => *n -= 1,
                None => {}
            }
        }
        self.inner.put(request, response).await
    }

    async fn count(&self) -> Result<u64, Error> {
        self.inner.count().await
    }

    async fn urls(&self) -> Result<Vec<String>, Error> {
        self.inner.urls().await
    }
}

/// Host that writes each call into a shared [`Journal`].
pub struct JournalHost {
    pub journal: Journal,
}

#[async_trait]
impl Host for JournalHost {
    async fn claim_clients(&self) -> Result<(), Error> {
        self.journal.lock().unwrap().push("claim".to_string());
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.journal.lock().unwrap().push(format!("open {url}"));
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.journal.lock().unwrap().push(format!("show {}", notification.title));
        Ok(())
    }

    async fn close_notification(&self, title: &str) -> Result<(), Error> {
        self.journal.lock().unwrap().push(format!("close {title}"));
        Ok(())
    }
}
