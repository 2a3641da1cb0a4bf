//! cache_purge tool implementation.
//!
//! Trims conversations to the newest N and/or drops expired cache entries,
//! regardless of the size ceiling.

use crate::tools::json_result;
use lexcache_core::{OfflineEngine, PurgeOutcome};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Keep only the newest N conversations.
    pub keep_latest: Option<usize>,

    /// Remove cache entries whose expiry has passed.
    #[serde(default)]
    pub expired: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(engine: &OfflineEngine, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let outcome: PurgeOutcome = engine.purge(params.keep_latest, params.expired).await?;
    json_result(&outcome)
}
