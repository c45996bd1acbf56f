//! cache_get tool implementation.
//!
//! Retrieves one stored response by store name and request URL.

use ephone_core::{CacheDb, Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::fetch::Header;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Store name, e.g. "ephone-static-v1.0.0".
    pub store: String,

    /// Absolute request URL.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<Header>,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    pub body_bytes: usize,
    /// RFC 3339 time the entry was written.
    pub stored_at: String,
}

pub async fn get_impl(db: &CacheDb, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let request = Request::parse("GET", &params.url)?;
    let entry = db
        .get_entry(&params.store, &request.cache_key())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {}", request.url, params.store)))?;

    let response = entry.response;
    let output = CacheGetOutput {
        store: params.store,
        url: request.url.to_string(),
        status: response.status,
        status_text: response.status_text,
        headers: response
            .headers
            .into_iter()
            .map(|(name, value)| Header { name, value })
            .collect(),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
        body_bytes: response.body.len(),
        stored_at: entry.stored_at.to_rfc3339(),
    };

    json_result(&output)
}
