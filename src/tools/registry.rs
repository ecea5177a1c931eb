//! Tool registry and dispatcher.
//!
//! The registry is filled once at startup and only read afterwards. Before a
//! handler runs, the tool must exist and its arguments must satisfy the
//! tool's `ArgumentSchema`.

use crate::error::{ToolError, ToolResult};
use crate::tools::schema::ArgumentSchema;
use async_trait::async_trait;
use rmcp::model::{JsonObject, Tool};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Name, description and argument schema of one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub schema: ArgumentSchema,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ArgumentSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
        }
    }

    /// MCP tool definition for `tools/list`.
    pub fn to_tool(&self) -> Tool {
        Tool::new(
            self.name.clone(),
            self.description.clone(),
            Arc::new(self.schema.to_json_schema()),
        )
    }
}

/// Executes one tool with validated arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// `args` holds only the fields declared by the tool's schema.
    async fn call(&self, args: JsonObject) -> ToolResult<JsonValue>;
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Name to handler mapping, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A second tool with the same name is rejected.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> ToolResult<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(ToolError::configuration(format!(
                "Tool '{}' is registered twice",
                descriptor.name
            )));
        }
        debug!(tool = %descriptor.name, "Registering tool");
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor,
            handler,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i].descriptor)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors().map(|d| d.name.as_str()).collect()
    }

    /// Route a call to its handler.
    ///
    /// Unknown tools are `NotFound` and invalid arguments are `Validation`
    /// errors; in both cases no handler runs.
    pub async fn dispatch(&self, name: &str, args: Option<JsonObject>) -> ToolResult<JsonValue> {
        let tool = self
            .index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::not_found("Tool", name))?;

        let args = tool.descriptor.schema.validate(args.as_ref()).map_err(|e| {
            warn!(tool = %name, error = %e, "Rejected tool arguments");
            e
        })?;

        let start = Instant::now();
        let result = tool.handler.call(args).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(tool = %name, elapsed_ms, "Tool call succeeded"),
            Err(e) => warn!(
                tool = %name,
                elapsed_ms,
                kind = e.kind(),
                error = %e,
                "Tool call failed"
            ),
        }
        result
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
