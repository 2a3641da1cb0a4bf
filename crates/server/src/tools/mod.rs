//! MCP tool implementations.
//!
//! Each tool validates its parameters, calls one engine operation and
//! returns the result as pretty-printed JSON text content.

pub mod backup;
pub mod cache;
pub mod conversations;
pub mod query;
pub mod statistics;
pub mod sync;

use crate::error::ToolError;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Encode a tool output as a successful JSON text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::OutputFailed(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
