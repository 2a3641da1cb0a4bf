//! sync_offline_data tool implementation.

use super::json_result;
use lexcache_core::{NewConversation, OfflineEngine};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the sync_offline_data tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Conversations recorded by an offline client, stored as already
    /// synced. Missing user types default to "offline".
    #[serde(default)]
    pub offline_conversations: Vec<NewConversation>,
}

/// Implementation of the sync_offline_data tool.
pub async fn sync_impl(engine: &OfflineEngine, params: SyncParams) -> Result<CallToolResult, McpError> {
    let outcome = engine.sync_offline_data(&params.offline_conversations).await?;
    json_result(&outcome)
}
