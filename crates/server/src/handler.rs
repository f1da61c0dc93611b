//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use netfirst_core::Registration;
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

use crate::tools::cache::{CacheGetParams, CacheListParams, get_impl, list_impl};
use crate::tools::web_batch_fetch::{WebBatchFetchParams, batch_fetch_impl};
use crate::tools::web_fetch::{WebFetchParams, fetch_impl};
use crate::tools::worker::{activate_impl, install_impl, status_impl};

/// The main MCP server handler for netfirst.
#[derive(Clone)]
pub struct NetfirstServer {
    registration: Arc<Registration>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl NetfirstServer {
    /// Create a new server handler around a registered worker.
    pub fn new(registration: Arc<Registration>) -> Self {
        Self { registration, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the worker.
    ///
    /// Network first; when the network is unreachable the copy stored in the
    /// current generation is returned instead.
    #[tool(
        description = "Fetch a URL network-first. Falls back to the offline cache when the network is unreachable. Returns status, headers, body and whether it came from the network or the cache."
    )]
    async fn web_fetch(&self, params: Parameters<WebFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.registration, params.0).await
    }

    /// Fetch multiple URLs through the worker in parallel.
    #[tool(
        description = "Fetch multiple URLs network-first with bounded concurrency. Returns one result per URL in input order plus a summary of network, cache and failed counts."
    )]
    async fn web_batch_fetch(&self, params: Parameters<WebBatchFetchParams>) -> Result<CallToolResult, McpError> {
        batch_fetch_impl(&self.registration, params.0).await
    }

    /// Read a stored response without touching the network.
    #[tool(description = "Read a cached response for a URL from the current (or a named) cache generation. No network requests are made.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.registration, params.0).await
    }

    /// List cache generations with their entry counts.
    #[tool(description = "List cache generations with entry counts and the name of the current generation.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.registration, params.0).await
    }

    #[tool(description = "Show the worker lifecycle state, scope, manifest and current generation.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.registration).await
    }

    /// Precache the manifest into the current generation.
    #[tool(
        description = "Install the worker: precache every manifest URL into the current generation. All-or-nothing; activates immediately when skip_waiting is set."
    )]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.registration).await
    }

    /// Activate an installed worker.
    #[tool(description = "Activate an installed worker: delete superseded cache generations and start intercepting fetches.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.registration).await
    }
}

impl ServerHandler for NetfirstServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "netfirst".into(),
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
    use crate::tools::test_support::installed;

    #[tokio::test]
    async fn test_router_lists_all_tools() {
        let (registration, _fetcher) = installed().await;
        let server = NetfirstServer::new(registration);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_list",
                "web_batch_fetch",
                "web_fetch",
                "worker_activate",
                "worker_install",
                "worker_status"
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (registration, _fetcher) = installed().await;
        let info = NetfirstServer::new(registration).get_info();
        assert_eq!(info.server_info.name, "netfirst");
    }
}
