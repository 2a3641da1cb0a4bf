//! cache_put tool implementation.
//!
//! Stores a JSON value under a key with an optional TTL.

use crate::error::ToolError;
use crate::tools::json_result;
use lexcache_core::OfflineEngine;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Parameters for the cache_put tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePutParams {
    /// Key of the entry; an existing entry is replaced.
    pub key: String,

    /// Any JSON value.
    pub value: Value,

    /// Seconds until the entry expires (default: the configured cache TTL).
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// Output from the cache_put tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePutOutput {
    pub success: bool,
    pub key: String,
}

/// Implementation of the cache_put tool.
pub async fn put_impl(engine: &OfflineEngine, params: CachePutParams) -> Result<CallToolResult, McpError> {
    if params.key.is_empty() {
        return Err(ToolError::InvalidInput("key cannot be empty".into()).into());
    }
    if params.ttl_secs == Some(0) {
        return Err(ToolError::InvalidInput("ttl_secs must be greater than 0".into()).into());
    }

    engine
        .put_cached_value(&params.key, &params.value, params.ttl_secs.map(Duration::from_secs))
        .await?;
    json_result(&CachePutOutput { success: true, key: params.key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{engine, output};
    use serde_json::json;

    #[tokio::test]
    async fn test_put_with_ttl() {
        let engine = engine().await;
        let params = CachePutParams { key: "helpline".into(), value: json!({"number": "15100"}), ttl_secs: Some(60) };

        let put: CachePutOutput = output(&put_impl(&engine, params).await.unwrap());
        assert!(put.success);

        let entry = engine.get_cached_value("helpline").await.unwrap();
        assert_eq!(entry.value["number"], json!("15100"));
        assert_eq!((entry.expires_at.unwrap() - entry.timestamp).num_seconds(), 60);
    }

    #[tokio::test]
    async fn test_put_rejects_zero_ttl() {
        let engine = engine().await;
        let params = CachePutParams { key: "k".into(), value: json!(null), ttl_secs: Some(0) };

        assert!(put_impl(&engine, params).await.is_err());
    }

    #[tokio::test]
    async fn test_put_rejects_unrepresentable_ttl() {
        let engine = engine().await;
        let params = CachePutParams { key: "k".into(), value: json!(1), ttl_secs: Some(10_000_000_000_000) };

        let err = put_impl(&engine, params).await.unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode(-32602));
    }
}
