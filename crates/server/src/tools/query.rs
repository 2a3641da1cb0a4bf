//! process_offline_query tool implementation.

use super::json_result;
use crate::error::ToolError;
use lexcache_core::OfflineEngine;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the process_offline_query tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineQueryParams {
    /// The user's question, in Kannada or English.
    pub query: String,
}

/// Implementation of the process_offline_query tool.
///
/// Returns the resolver's `{response, source, confidence}` reply.
pub async fn query_impl(engine: &OfflineEngine, params: OfflineQueryParams) -> Result<CallToolResult, McpError> {
    if params.query.trim().is_empty() {
        return Err(ToolError::InvalidInput("query cannot be empty".into()).into());
    }

    let resolution = engine.process_offline_query(&params.query).await;
    json_result(&resolution)
}
