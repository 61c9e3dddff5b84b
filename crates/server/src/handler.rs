//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the offline cache service.
use std::sync::Arc;

use crate::tools::{
    OfflineDeployParams, OfflineFetchParams, OfflineStatusParams, deploy_impl, fetch_impl, status_impl,
};
use bivouac_client::SiteService;

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

/// The main MCP server handler for bivouac.
#[derive(Clone)]
pub struct BivouacServer {
    service: Arc<SiteService>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl BivouacServer {
    /// Create a new server handler around an opened service.
    pub fn new(service: Arc<SiteService>) -> Self {
        Self { service, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the offline cache.
    ///
    /// Same-origin GETs are answered by the active generation's strategy
    /// (network-first for pages, cache-first for assets); everything else
    /// goes straight to the network.
    #[tool(
        description = "Fetch a URL through the offline cache. Pages are network-first with offline fallback; assets are cache-first."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(self.service.as_ref(), params.0).await
    }

    /// Report generation state and cache contents.
    #[tool(description = "Report the cache generation, its lifecycle state, and optionally the cached URLs.")]
    async fn offline_status(&self, params: Parameters<OfflineStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(self.service.as_ref(), params.0).await
    }

    /// Precache the manifest and activate the generation.
    #[tool(description = "Install the configured cache generation and activate it, removing older generations.")]
    async fn offline_deploy(&self, params: Parameters<OfflineDeployParams>) -> Result<CallToolResult, McpError> {
        deploy_impl(self.service.as_ref(), params.0).await
    }
}

impl ServerHandler for BivouacServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "bivouac".into(),
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
