//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the offline engine.
use crate::tools::{
    backup::{ImportParams, export_impl, import_impl},
    cache::{CacheGetParams, CachePurgeParams, CachePutParams, get_impl, purge_impl, put_impl},
    conversations::{self, CacheConversationParams},
    query::{OfflineQueryParams, query_impl},
    statistics::statistics_impl,
    sync::{SyncParams, sync_impl},
};

use lexcache_core::OfflineEngine;
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

/// The main MCP server handler for lexcache.
#[derive(Clone)]
pub struct LexCacheServer {
    engine: OfflineEngine,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl LexCacheServer {
    /// Create a new server handler over an opened engine.
    pub fn new(engine: OfflineEngine) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    #[tool(description = "Append conversation turns and upsert user preferences in the offline cache. Evicts old \
                          conversations when the cache exceeds its size ceiling.")]
    async fn cache_conversation_data(
        &self, params: Parameters<CacheConversationParams>,
    ) -> Result<CallToolResult, McpError> {
        conversations::cache_impl(&self.engine, params.0).await
    }

    #[tool(description = "Return recent cached conversations (newest first), preferences and the legal knowledge \
                          base. Falls back to the knowledge base alone if the cache is unreadable.")]
    async fn get_cached_data(&self) -> Result<CallToolResult, McpError> {
        conversations::get_impl(&self.engine).await
    }

    /// Answer a legal question offline.
    ///
    /// The query is recorded as an unsynced offline conversation.
    #[tool(description = "Answer a legal question from the offline Kannada knowledge base. Returns response, source \
                          and confidence.")]
    async fn process_offline_query(&self, params: Parameters<OfflineQueryParams>) -> Result<CallToolResult, McpError> {
        query_impl(&self.engine, params.0).await
    }

    #[tool(description = "Mark all unsynced conversations as synced and store the given offline conversations as \
                          synced.")]
    async fn sync_offline_data(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.engine, params.0).await
    }

    #[tool(description = "Write a JSON snapshot of the cached state to the cache directory. Returns its path.")]
    async fn export_offline_data(&self) -> Result<CallToolResult, McpError> {
        export_impl(&self.engine).await
    }

    #[tool(description = "Replay the conversations and preferences of a snapshot file into the cache.")]
    async fn import_offline_data(&self, params: Parameters<ImportParams>) -> Result<CallToolResult, McpError> {
        import_impl(&self.engine, params.0).await
    }

    #[tool(description = "Report conversation counts, cache size and knowledge base size.")]
    async fn get_offline_statistics(&self) -> Result<CallToolResult, McpError> {
        statistics_impl(&self.engine).await
    }

    #[tool(description = "Store a JSON value in the offline cache under a key, with an optional TTL in seconds.")]
    async fn cache_put(&self, params: Parameters<CachePutParams>) -> Result<CallToolResult, McpError> {
        put_impl(&self.engine, params.0).await
    }

    #[tool(description = "Retrieve a live cache entry by key.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.engine, params.0).await
    }

    #[tool(description = "Trim cached conversations to the newest N and/or remove expired cache entries.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.engine, params.0).await
    }
}

impl ServerHandler for LexCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "lexcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some("Offline cache for a Kannada legal assistant. Use process_offline_query when the \
                                online model is unreachable and sync_offline_data once connectivity returns."
                .into()),
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
    use crate::tools::test_support::engine;

    #[tokio::test]
    async fn test_all_tools_listed() {
        let server = LexCacheServer::new(engine().await);
        let names: Vec<_> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();

        for expected in [
            "cache_conversation_data",
            "get_cached_data",
            "process_offline_query",
            "sync_offline_data",
            "export_offline_data",
            "import_offline_data",
            "get_offline_statistics",
            "cache_put",
            "cache_get",
            "cache_purge",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {expected}");
        }
    }
}
