//! cache_get tool implementation.
//!
//! Retrieves a live cache entry by key.

use crate::tools::json_result;
use lexcache_core::{CacheEntry, OfflineEngine};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The key of the cache entry to retrieve.
    pub key: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// The cached entry.
    pub entry: CacheEntry,
}

/// Implementation of the cache_get tool.
///
/// Expired entries are reported as a cache miss.
pub async fn get_impl(engine: &OfflineEngine, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let entry = engine.get_cached_value(&params.key).await?;
    json_result(&CacheGetOutput { entry })
}
