//! MCP tool implementations.
//!
//! Each tool drives one worker event (or inspects the stores) and reports
//! what happened, including any host effects the worker requested.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

use ephone_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
