//! get_offline_statistics tool implementation.

use super::json_result;
use lexcache_core::{OfflineEngine, OfflineStatistics};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the get_offline_statistics tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatisticsOutput {
    #[serde(flatten)]
    pub statistics: OfflineStatistics,
    /// Set when the store-backed counters could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Implementation of the get_offline_statistics tool.
pub async fn statistics_impl(engine: &OfflineEngine) -> Result<CallToolResult, McpError> {
    let fallback = engine.get_offline_statistics().await;
    json_result(&StatisticsOutput { statistics: fallback.value, error: fallback.error.map(|e| e.to_string()) })
}
