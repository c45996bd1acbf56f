//! MCP server handler implementation.
//!
//! This module defines the server handler that routes tool calls to the
//! worker and to the cache inspection tools.

use std::sync::Arc;

use ephone_core::CacheDb;
use ephone_worker::{RecordingHost, ServiceWorker};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::cache::{CacheGetParams, get_impl, list_impl};
use crate::tools::events::{
    SwErrorParams, SwMessageParams, SwNotificationClickParams, SwPushParams, SwSyncParams, error_impl, message_impl,
    notification_click_impl, push_impl, sync_impl,
};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl, status_impl};

/// The MCP server handler for ephone-sw.
#[derive(Clone)]
pub struct EphoneSwServer {
    worker: Arc<ServiceWorker>,
    db: CacheDb,
    host: Arc<RecordingHost>,
    notification_title: String,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl EphoneSwServer {
    /// Create a handler around a worker backed by `db`.
    pub fn new(worker: Arc<ServiceWorker>, db: CacheDb, host: Arc<RecordingHost>, notification_title: String) -> Self {
        Self { worker, db, host, notification_title, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: pre-cache the static manifest into the current static store.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate the installed worker: delete stale stores and claim open clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker, &self.host).await
    }

    #[tool(description = "Report lifecycle state, current store names and the static manifest.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    #[tool(
        description = "Deliver a fetch event. Intercepted requests are served cache-first; the output says whether the answer came from the cache, the network or an offline fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. Returns the notification the worker shows.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Deliver a notification click, optionally on the 'explore' or 'close' action.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, &self.host, &self.notification_title, params.0).await
    }

    #[tool(description = "Post a message to the worker. {\"type\": \"SKIP_WAITING\"} activates a waiting worker.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Deliver a background sync event for a tag.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Report an uncaught error or unhandled rejection to the worker's log.")]
    async fn sw_error(&self, params: Parameters<SwErrorParams>) -> Result<CallToolResult, McpError> {
        error_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "List cache stores with entry counts and stored URLs.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.db, self.worker.names()).await
    }

    #[tool(description = "Read one stored response by store name and request URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.db, params.0).await
    }
}

impl ServerHandler for EphoneSwServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "ephone-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::bridge;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let b = bridge().await;
        let server = EphoneSwServer::new(b.worker, b.db, b.host, "EPhone".into());

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_list",
                "sw_activate",
                "sw_error",
                "sw_fetch",
                "sw_install",
                "sw_message",
                "sw_notification_click",
                "sw_push",
                "sw_status",
                "sw_sync",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let b = bridge().await;
        let server = EphoneSwServer::new(b.worker, b.db, b.host, "EPhone".into());
        assert_eq!(server.get_info().server_info.name, "ephone-sw");
    }
}
