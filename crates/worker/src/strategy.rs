//! Cache-first with write-through.
//!
//! 1. Look the request up in its store; a fresh hit is returned immediately
//! 2. On a miss, fetch from the network
//! 3. A `200` network answer is snapshotted into the store before returning
//! 4. Any other answer is returned untouched and not stored
//! 5. If no answer reached us at all, serve a stale hit if there is one,
//!    otherwise the role's offline fallback, otherwise the original error
//!
//! A store read or write failure never fails the request; it is logged and
//! the request carries on as a miss or an unstored answer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ephone_client::Fetcher;
use ephone_core::{Cache, CachedEntry, Destination, Error, Request, Response};
use serde::Serialize;

use crate::expiry::{ExpiryPolicy, StaleForever};
use crate::naming::StoreRole;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// A fresh store hit.
    Cache,
    /// A live network answer.
    Network,
    /// A stale store hit served because the network failed.
    Offline,
    /// The offline fallback for this request's destination.
    Fallback,
}

/// A response plus where it came from.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    /// When the entry was stored, for store hits.
    pub stored_at: Option<DateTime<Utc>>,
}

impl Served {
    fn cached(entry: CachedEntry, source: ResponseSource) -> Self {
        Self { response: entry.response, source, stored_at: Some(entry.stored_at) }
    }

    fn network(response: Response) -> Self {
        Self { response, source: ResponseSource::Network, stored_at: None }
    }

    fn fallback(response: Response) -> Self {
        Self { response, source: ResponseSource::Fallback, stored_at: None }
    }
}

/// What to serve when both store and network come up empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineFallback {
    /// Serve the stored app shell for this request.
    AppShell(Request),
    /// Serve an empty `404` so broken images degrade quietly.
    NotFound,
    /// Surface the network error.
    None,
}

impl OfflineFallback {
    /// Document navigations in the static store get the app shell; images in
    /// the dynamic store get an empty 404. Nothing else has a fallback.
    pub fn for_request(role: StoreRole, request: &Request, shell: &Request) -> Self {
        match (role, request.destination) {
            (StoreRole::Static, Destination::Document) => OfflineFallback::AppShell(shell.clone()),
            (StoreRole::Dynamic, Destination::Image) => OfflineFallback::NotFound,
            _ => OfflineFallback::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheFirst {
    expiry: Arc<dyn ExpiryPolicy>,
}

impl Default for CacheFirst {
    fn default() -> Self {
        Self { expiry: Arc::new(StaleForever) }
    }
}

impl CacheFirst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expiry(expiry: Arc<dyn ExpiryPolicy>) -> Self {
        Self { expiry }
    }

    pub async fn respond(
        &self, store: &dyn Cache, fetcher: &dyn Fetcher, request: &Request, fallback: &OfflineFallback,
    ) -> Result<Served, Error> {
        let cached = match store.get(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(store = store.name(), url = %request.url, error = %e, "store read failed");
                None
            }
        };

        let stale = match cached {
            Some(entry) if self.expiry.is_fresh(&entry, Utc::now()) => {
                tracing::debug!(store = store.name(), url = %request.url, "cache hit");
                return Ok(Served::cached(entry, ResponseSource::Cache));
            }
            other => other,
        };

        match fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    if let Err(e) = store.put(request, response.snapshot()).await {
                        tracing::warn!(store = store.name(), url = %request.url, error = %e, "store write failed");
                    }
                } else {
                    tracing::debug!(url = %request.url, status = response.status, "not storing non-200 answer");
                }
                Ok(Served::network(response))
            }
            Err(e) if e.is_network_failure() => {
                if let Some(entry) = stale {
                    tracing::info!(url = %request.url, "network failed, serving stale entry");
                    return Ok(Served::cached(entry, ResponseSource::Offline));
                }
                self.fall_back(store, request, fallback, e).await
            }
            Err(e) => Err(e),
        }
    }

    async fn fall_back(
        &self, store: &dyn Cache, request: &Request, fallback: &OfflineFallback, cause: Error,
    ) -> Result<Served, Error> {
        match fallback {
            OfflineFallback::AppShell(shell) => match store.get(shell).await {
                Ok(Some(entry)) => {
                    tracing::info!(url = %request.url, shell = %shell.url, "offline, serving app shell");
                    Ok(Served::fallback(entry.response))
                }
                Ok(None) => {
                    tracing::warn!(url = %request.url, "offline and no app shell stored");
                    Err(cause)
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "app shell lookup failed");
                    Err(cause)
                }
            },
            OfflineFallback::NotFound => {
                tracing::debug!(url = %request.url, "offline, serving empty 404 for image");
                Ok(Served::fallback(Response::not_found()))
            }
            OfflineFallback::None => {
                tracing::warn!(url = %request.url, error = %cause, "fetch failed with no fallback");
                Err(cause)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::MaxAge;
    use crate::testing::ScriptedFetcher;
    use ephone_core::{CacheStorage, MemoryCacheStorage};

    const PAGE: &str = "https://app.example/chat.html";
    const SHELL: &str = "https://app.example/index.html";
    const IMAGE: &str = "https://i.postimg.cc/a/cat.png";

    fn req(url: &str, destination: Destination) -> Request {
        Request::parse("GET", url).unwrap().with_destination(destination)
    }

    fn shell() -> Request {
        req(SHELL, Destination::Empty)
    }

    async fn store() -> Arc<dyn Cache> {
        MemoryCacheStorage::new().open("ephone-static-v1.0.0").await.unwrap()
    }

    #[tokio::test]
    async fn test_hit_skips_network() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        let request = req(PAGE, Destination::Document);
        store.put(&request, Response::ok("stored")).await.unwrap();

        let served = CacheFirst::new().respond(&*store, &*fetcher, &request, &OfflineFallback::None).await.unwrap();

        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body.as_ref(), b"stored");
        assert!(served.stored_at.is_some());
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores_200() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.route(PAGE, Response::ok("live").with_header("Content-Type", "text/html"));
        let request = req(PAGE, Destination::Document);

        let served = CacheFirst::new().respond(&*store, &*fetcher, &request, &OfflineFallback::None).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.body.as_ref(), b"live");

        let entry = store.get(&request).await.unwrap().unwrap();
        assert_eq!(entry.response, served.response);
    }

    #[tokio::test]
    async fn test_second_request_served_from_store() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.route(PAGE, Response::ok("live"));
        let request = req(PAGE, Destination::Document);
        let strategy = CacheFirst::new();

        strategy.respond(&*store, &*fetcher, &request, &OfflineFallback::None).await.unwrap();
        let again = strategy.respond(&*store, &*fetcher, &request, &OfflineFallback::None).await.unwrap();

        assert_eq!(again.source, ResponseSource::Cache);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_200_returned_but_not_stored() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.route(PAGE, Response::new(500, "boom"));
        let request = req(PAGE, Destination::Document);

        let served = CacheFirst::new().respond(&*store, &*fetcher, &request, &OfflineFallback::None).await.unwrap();

        assert_eq!(served.response.status, 500);
        assert!(store.get(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_content_not_stored() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.route(PAGE, Response::new(206, "part"));
        let request = req(PAGE, Destination::Empty);

        CacheFirst::new().respond(&*store, &*fetcher, &request, &OfflineFallback::None).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_document_gets_app_shell() {
        let store = store().await;
        store.put(&shell(), Response::ok("<html>shell</html>")).await.unwrap();
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let request = req(PAGE, Destination::Document);
        let fallback = OfflineFallback::for_request(StoreRole::Static, &request, &shell());

        let served = CacheFirst::new().respond(&*store, &*fetcher, &request, &fallback).await.unwrap();

        assert_eq!(served.source, ResponseSource::Fallback);
        assert_eq!(served.response.body.as_ref(), b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_offline_document_without_shell_fails() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let request = req(PAGE, Destination::Document);
        let fallback = OfflineFallback::for_request(StoreRole::Static, &request, &shell());

        let result = CacheFirst::new().respond(&*store, &*fetcher, &request, &fallback).await;

        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_offline_script_has_no_fallback() {
        let store = store().await;
        store.put(&shell(), Response::ok("shell")).await.unwrap();
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let request = req("https://app.example/app.js", Destination::Script);
        let fallback = OfflineFallback::for_request(StoreRole::Static, &request, &shell());

        assert_eq!(fallback, OfflineFallback::None);
        let result = CacheFirst::new().respond(&*store, &*fetcher, &request, &fallback).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_offline_image_gets_empty_404() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let request = req(IMAGE, Destination::Image);
        let fallback = OfflineFallback::for_request(StoreRole::Dynamic, &request, &shell());

        let served = CacheFirst::new().respond(&*store, &*fetcher, &request, &fallback).await.unwrap();

        assert_eq!(served.response.status, 404);
        assert!(served.response.body.is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_font_fails() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let request = req("https://fonts.gstatic.com/s/a.woff2", Destination::Font);
        let fallback = OfflineFallback::for_request(StoreRole::Dynamic, &request, &shell());

        let result = CacheFirst::new().respond(&*store, &*fetcher, &request, &fallback).await;
        assert!(matches!(result, Err(ref e) if e.is_network_failure()));
    }

    #[tokio::test]
    async fn test_oversize_image_is_an_error_not_a_404() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.route_too_large(IMAGE);
        let request = req(IMAGE, Destination::Image);
        let fallback = OfflineFallback::for_request(StoreRole::Dynamic, &request, &shell());

        let result = CacheFirst::new().respond(&*store, &*fetcher, &request, &fallback).await;

        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oversize_document_does_not_serve_shell() {
        let store = store().await;
        store.put(&shell(), Response::ok("<html>shell</html>")).await.unwrap();
        let fetcher = ScriptedFetcher::new();
        fetcher.route_too_large(PAGE);
        let request = req(PAGE, Destination::Document);
        let fallback = OfflineFallback::for_request(StoreRole::Static, &request, &shell());

        let result = CacheFirst::new().respond(&*store, &*fetcher, &request, &fallback).await;

        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
        assert!(store.get(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_refreshed() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.route(PAGE, Response::ok("new"));
        let request = req(PAGE, Destination::Document);
        store.put(&request, Response::ok("old")).await.unwrap();
        let strategy = CacheFirst::with_expiry(Arc::new(MaxAge(chrono::Duration::milliseconds(-1))));

        let served = strategy.respond(&*store, &*fetcher, &request, &OfflineFallback::None).await.unwrap();

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(store.get(&request).await.unwrap().unwrap().response.body.as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_expired_entry_served_when_offline() {
        let store = store().await;
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let request = req(PAGE, Destination::Document);
        store.put(&request, Response::ok("old")).await.unwrap();
        let strategy = CacheFirst::with_expiry(Arc::new(MaxAge(chrono::Duration::milliseconds(-1))));

        let served = strategy.respond(&*store, &*fetcher, &request, &OfflineFallback::None).await.unwrap();

        assert_eq!(served.source, ResponseSource::Offline);
        assert_eq!(served.response.body.as_ref(), b"old");
    }

    #[test]
    fn test_fallback_selection() {
        let page = req(PAGE, Destination::Document);
        let image = req(IMAGE, Destination::Image);
        assert_eq!(OfflineFallback::for_request(StoreRole::Static, &page, &shell()), OfflineFallback::AppShell(shell()));
        assert_eq!(OfflineFallback::for_request(StoreRole::Dynamic, &image, &shell()), OfflineFallback::NotFound);
        assert_eq!(OfflineFallback::for_request(StoreRole::Static, &image, &shell()), OfflineFallback::None);
        assert_eq!(OfflineFallback::for_request(StoreRole::Dynamic, &page, &shell()), OfflineFallback::None);
    }
}
