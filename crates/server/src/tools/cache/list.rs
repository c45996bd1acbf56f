//! cache_list tool implementation.
//!
//! Lists every store with its entry count, in creation order.

use ephone_core::CacheDb;
use ephone_worker::StoreNames;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    /// Whether this is one of the current version's stores.
    pub current: bool,
    /// Stored URLs, oldest first.
    pub urls: Vec<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreSummary>,
}

pub async fn list_impl(db: &CacheDb, names: &StoreNames) -> Result<CallToolResult, McpError> {
    let mut stores = Vec::new();
    for name in db.store_names().await? {
        let entries = db.count_entries(&name).await?;
        let urls = db.entry_urls(&name).await?;
        let current = names.is_current(&name);
        stores.push(StoreSummary { name, entries, current, urls });
    }

    json_result(&CacheListOutput { stores })
}
