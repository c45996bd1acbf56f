//! sw_fetch tool implementation.
//!
//! Delivers a fetch event to the worker and reports how it was answered.

use ephone_core::{Destination, Request, Response};
use ephone_worker::{ServiceWorker, Served};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL of the request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document", "image", "font", "script", "style",
    /// ... or "empty" (default).
    #[serde(default)]
    pub destination: Destination,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// False when the worker let the request pass through.
    pub intercepted: bool,
    /// "cache", "network", "offline" or "fallback".
    pub source: Option<String>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub headers: Vec<Header>,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    pub body_bytes: usize,
    /// When the served entry was stored (RFC 3339), for store hits.
    pub stored_at: Option<String>,
}

impl SwFetchOutput {
    fn passthrough() -> Self {
        Self {
            intercepted: false,
            source: None,
            status: None,
            status_text: None,
            headers: Vec::new(),
            body: None,
            body_bytes: 0,
            stored_at: None,
        }
    }

    fn served(served: Served) -> Self {
        let source = serde_json::to_value(served.source)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string));
        let Response { status, status_text, headers, body, .. } = served.response;

        Self {
            intercepted: true,
            source,
            status: Some(status),
            status_text: Some(status_text),
            headers: headers.into_iter().map(|(name, value)| Header { name, value }).collect(),
            body: std::str::from_utf8(&body).ok().map(str::to_string),
            body_bytes: body.len(),
            stored_at: served.stored_at.map(|t| t.to_rfc3339()),
        }
    }
}

pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = Request::parse(&params.method, &params.url)?.with_destination(params.destination);

    let output = match worker.fetch(&request).await? {
        Some(served) => SwFetchOutput::served(served),
        None => SwFetchOutput::passthrough(),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_bridge, bridge, output};

    fn params(url: &str, destination: Destination) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), destination }
    }

    #[tokio::test]
    async fn test_fetch_precached_shell() {
        let b = active_bridge().await;
        let result = fetch_impl(&b.worker, params("https://app.example/index.html", Destination::Document))
            .await
            .unwrap();
        let out: SwFetchOutput = output(&result);

        assert!(out.intercepted);
        assert_eq!(out.source.as_deref(), Some("cache"));
        assert_eq!(out.status, Some(200));
        assert_eq!(out.body.as_deref(), Some("<html>shell</html>"));
        assert!(out.stored_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_dynamic_then_cached() {
        let b = active_bridge().await;
        let p = || params("https://i.postimg.cc/a/cat.png", Destination::Image);

        let first: SwFetchOutput = output(&fetch_impl(&b.worker, p()).await.unwrap());
        let second: SwFetchOutput = output(&fetch_impl(&b.worker, p()).await.unwrap());

        assert_eq!(first.source.as_deref(), Some("network"));
        assert_eq!(second.source.as_deref(), Some("cache"));
        assert_eq!(b.db.count_entries("ephone-dynamic-v1.0.0").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_offline_image_fallback() {
        let b = active_bridge().await;
        b.fetcher.set_offline(true);

        let out: SwFetchOutput =
            output(&fetch_impl(&b.worker, params("https://files.catbox.moe/z.gif", Destination::Image)).await.unwrap());

        assert_eq!(out.source.as_deref(), Some("fallback"));
        assert_eq!(out.status, Some(404));
        assert_eq!(out.body_bytes, 0);
    }

    #[tokio::test]
    async fn test_fetch_offline_without_fallback_errors() {
        let b = active_bridge().await;
        b.fetcher.set_offline(true);

        let err = fetch_impl(&b.worker, params("https://app.example/missing.js", Destination::Script))
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32008);
    }

    #[tokio::test]
    async fn test_fetch_passthrough() {
        let b = active_bridge().await;
        let p = SwFetchParams {
            url: "https://app.example/api".into(),
            method: "POST".into(),
            destination: Destination::Empty,
        };
        let out: SwFetchOutput = output(&fetch_impl(&b.worker, p).await.unwrap());
        assert!(!out.intercepted);
    }

    #[tokio::test]
    async fn test_fetch_before_activation_passes_through() {
        let b = bridge().await;
        let out: SwFetchOutput =
            output(&fetch_impl(&b.worker, params("https://app.example/", Destination::Document)).await.unwrap());
        assert!(!out.intercepted);
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let b = bridge().await;
        let err = fetch_impl(&b.worker, params("not a url", Destination::Empty)).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }

    #[test]
    fn test_params_defaults() {
        let p: SwFetchParams = serde_json::from_str(r#"{"url": "https://app.example/"}"#).unwrap();
        assert_eq!(p.method, "GET");
        assert_eq!(p.destination, Destination::Empty);

        let p: SwFetchParams =
            serde_json::from_str(r#"{"url": "https://app.example/", "destination": "document"}"#).unwrap();
        assert_eq!(p.destination, Destination::Document);
    }

    #[tokio::test]
    async fn test_iframe_destination_accepted() {
        let b = active_bridge().await;
        let p: SwFetchParams =
            serde_json::from_str(r#"{"url": "https://app.example/index.html", "destination": "iframe"}"#).unwrap();
        assert_eq!(p.destination, Destination::Iframe);

        let out: SwFetchOutput = output(&fetch_impl(&b.worker, p).await.unwrap());
        assert!(out.intercepted);
        assert_eq!(out.source.as_deref(), Some("cache"));
    }
}
