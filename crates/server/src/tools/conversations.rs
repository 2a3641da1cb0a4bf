//! cache_conversation_data and get_cached_data tool implementations.

use super::json_result;
use lexcache_core::{CachedData, NewConversation, OfflineEngine, Preferences};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_conversation_data tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheConversationParams {
    /// Conversation turns to append. Missing timestamps default to now,
    /// missing user types to "user".
    #[serde(default)]
    pub conversations: Vec<NewConversation>,

    /// Preferences to upsert by key.
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

/// Output from the cache_conversation_data tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheConversationOutput {
    /// Always true when the write committed.
    pub success: bool,
    /// Number of conversation turns written.
    pub cached_count: usize,
    /// Cache size after eviction, in bytes.
    pub cache_size_bytes: u64,
}

/// Output from the get_cached_data tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedDataOutput {
    #[serde(flatten)]
    pub data: CachedData,
    /// Set when the store could not be read and only the knowledge base is
    /// present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Implementation of the cache_conversation_data tool.
pub async fn cache_impl(engine: &OfflineEngine, params: CacheConversationParams) -> Result<CallToolResult, McpError> {
    let outcome = engine
        .cache_conversation_data(&params.conversations, params.preferences.as_ref())
        .await?;

    json_result(&CacheConversationOutput {
        success: true,
        cached_count: outcome.cached_count,
        cache_size_bytes: outcome.cache_size_bytes,
    })
}

/// Implementation of the get_cached_data tool.
///
/// Never fails on a store error; the reply carries the error instead.
pub async fn get_impl(engine: &OfflineEngine) -> Result<CallToolResult, McpError> {
    let fallback = engine.get_cached_data().await;
    json_result(&CachedDataOutput { data: fallback.value, error: fallback.error.map(|e| e.to_string()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{engine, output};
    use serde_json::json;

    #[tokio::test]
    async fn test_cache_then_get() {
        let engine = engine().await;
        let params: CacheConversationParams = serde_json::from_value(json!({
            "conversations": [
                {"query": "ಜಾಮೀನು ಹೇಗೆ?", "response": "...", "timestamp": "2024-01-05 08:00:00"},
                {"query": "second", "response": "r", "user_type": "offline"}
            ],
            "preferences": {"language": "kn"}
        }))
        .unwrap();

        let cached: CacheConversationOutput = output(&cache_impl(&engine, params).await.unwrap());
        assert!(cached.success);
        assert_eq!(cached.cached_count, 2);

        let data: CachedDataOutput = output(&get_impl(&engine).await.unwrap());
        assert!(data.error.is_none());
        assert_eq!(data.data.conversations.len(), 2);
        assert_eq!(data.data.conversations[0].query, "second");
        assert_eq!(data.data.preferences["language"], json!("kn"));
        assert_eq!(data.data.knowledge_base.emergency_contacts.len(), 4);
    }

    #[tokio::test]
    async fn test_cache_rejects_record_without_response() {
        let parsed = serde_json::from_value::<CacheConversationParams>(json!({
            "conversations": [{"query": "q"}]
        }));
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_cache_rejects_five_digit_year() {
        let parsed = serde_json::from_value::<CacheConversationParams>(json!({
            "conversations": [{"query": "q", "response": "r", "timestamp": "+10000-01-01T00:00:00"}]
        }));
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_cache_empty_request() {
        let engine = engine().await;
        let params = CacheConversationParams { conversations: vec![], preferences: None };

        let cached: CacheConversationOutput = output(&cache_impl(&engine, params).await.unwrap());
        assert_eq!(cached.cached_count, 0);
    }
}
