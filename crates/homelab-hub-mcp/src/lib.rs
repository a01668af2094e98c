//! homelab-hub MCP Server
//!
//! Exposes the homelab-hub inventory API to AI assistants via Model Context
//! Protocol. Serves MCP over stdio with `rmcp`; every tool call is mapped
//! onto one or more authenticated HTTP calls against the backend.

pub mod catalog;
pub mod client;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;

use std::sync::Arc;

use log::{debug, error, info};
use rmcp::model::*;
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::{json, Value};

use crate::client::InventoryBackend;

/// Server name
pub const SERVER_NAME: &str = "homelab-hub";

/// Server version
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const INSTRUCTIONS: &str = "homelab-hub MCP Server - Query and manage the homelab inventory.\n\n\
    Read: inventory_list, inventory_all, inventory_search, map_graph, app_status\n\
    Write: inventory_create, inventory_update, inventory_delete (needs confirm=true)\n\
    Network: health_check, discover_subnet (import_alive=true adds alive hosts)\n\
    Maintenance: search_index";

/// homelab-hub MCP server, generic over the backend it forwards to.
pub struct HomelabServer<B> {
    backend: Arc<B>,
}

impl<B> Clone for HomelabServer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: InventoryBackend> HomelabServer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one tool and wrap the outcome. Never fails: errors become an
    /// `isError` result.
    pub async fn run_tool(&self, name: &str, arguments: Value) -> CallToolResult {
        match dispatch::execute(self.backend.as_ref(), name, arguments).await {
            Ok(payload) => {
                let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
                CallToolResult::success(vec![Content::text(text)])
            }
            Err(e) => CallToolResult::error(vec![Content::text(format!("Error: {}", e))]),
        }
    }

    /// Serve MCP over stdin/stdout until the client disconnects.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!("MCP server ready, listening on stdio...");
        let service = self.serve(rmcp::transport::stdio()).await?;
        let reason = service.waiting().await?;
        info!("MCP session ended: {:?}", reason);
        Ok(())
    }
}

impl<B: InventoryBackend> ServerHandler for HomelabServer<B> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(catalog::tool_definitions()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = request.name.to_string();
        let arguments = request.arguments.map(Value::Object).unwrap_or_else(|| json!({}));
        debug!("Calling tool: {}", name);

        // Own task per call, so a panic surfaces as an error response.
        let server = self.clone();
        tokio::spawn(async move { server.run_tool(&name, arguments).await })
            .await
            .map_err(|e| {
                error!("Tool call failed: {}", e);
                ErrorData::internal_error(format!("Tool call failed: {}", e), None)
            })
    }
}
