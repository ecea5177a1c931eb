//! MCP service implementation using rmcp.
//!
//! `OpsService` serves the tool registry: `tools/list` renders the
//! registered descriptors and `tools/call` goes through the registry's
//! dispatcher. Tool failures are returned as MCP errors whose `data.kind`
//! names the error category.

use crate::tools::ToolRegistry;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool,
    },
    service::RequestContext,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

const INSTRUCTIONS: &str = "Operations tools for AWS and two PostgreSQL databases.\n\
\n\
## Tools\n\
- `aws`: call an AWS SDK command by client class name and lowerCamelCase command name. \
Parameters are a JSON string with PascalCase keys.\n\
- `database_query_readonly_reporting` / `database_query_readonly_general`: run one SQL \
statement inside a READ ONLY transaction. Returns rows as JSON objects.\n\
- `database_query_write_reporting` / `database_query_write_general`: run one SQL statement \
inside a read-write transaction. Committed on success, rolled back on any error.\n\
\n\
## Write policy\n\
Write tools change production data. Before calling one, show the user the exact query and \
wait for explicit confirmation.\n\
\n\
## Errors\n\
Errors carry `data.kind`: `validation` and `invalid_argument` mean the arguments need fixing, \
`not_found` means the tool, client or command does not exist, `execution` means the database \
or AWS rejected the call, `connection` and `timeout` may succeed on retry.";

#[derive(Clone)]
pub struct OpsService {
    registry: Arc<ToolRegistry>,
}

impl OpsService {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// MCP tool definitions, in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.registry.descriptors().map(|d| d.to_tool()).collect()
    }

    /// Dispatch one call and wrap its JSON result as tool content.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let value: JsonValue = self.registry.dispatch(name, arguments).await?;
        Ok(CallToolResult::success(vec![Content::json(value)?]))
    }
}

impl std::fmt::Debug for OpsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpsService")
            .field("registry", &self.registry)
            .finish()
    }
}

impl ServerHandler for OpsService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ops-mcp-server".to_owned(),
                title: Some("Ops MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.call(&request.name, request.arguments).await
    }
}
