//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the cache engine.
use crate::tools::cache::{CacheKeysParams, CachePurgeParams, keys_impl, purge_impl};
use crate::tools::{FetchParams, PostMessageParams, fetch_impl, post_message_impl};

use keepsake_client::CacheEngine;
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

/// The main MCP server handler for keepsake.
#[derive(Clone)]
pub struct KeepsakeServer {
    engine: CacheEngine,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl KeepsakeServer {
    /// Create a new server handler around a started engine.
    pub fn new(engine: CacheEngine) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the cache engine.
    ///
    /// The request is routed to a strategy by resource type, and the response
    /// reports whether it came from the network, a cache partition or the
    /// offline fallback.
    #[tool(
        description = "Fetch a URL through the offline cache. Reports status, source (network/cache/offline/bypass), strategy and partition."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    /// Send a control message to the engine.
    #[tool(
        description = "Send a control message: SKIP_WAITING, CACHE_NEW_ASSETS {urls, partition}, GET_CACHE_SIZE or CLEAR_CACHE. Returns the reply, if any."
    )]
    async fn post_message(&self, params: Parameters<PostMessageParams>) -> Result<CallToolResult, McpError> {
        post_message_impl(&self.engine, params.0).await
    }

    /// List cache partitions or the keys of one partition.
    #[tool(description = "List cache partitions with entry counts and sizes, or the request keys of one partition.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.engine.db(), params.0).await
    }

    /// Delete or trim a cache partition.
    #[tool(description = "Delete a cache partition, or trim it to its size budget by evicting the oldest entries.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.engine, params.0).await
    }
}

impl ServerHandler for KeepsakeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "keepsake".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
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
    async fn test_lists_all_tools() {
        let (engine, _) = engine().await;
        let server = KeepsakeServer::new(engine);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_keys", "cache_purge", "fetch", "post_message"]);
        assert_eq!(server.get_info().server_info.name, "keepsake");
    }
}
