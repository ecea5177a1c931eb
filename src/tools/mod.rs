//! MCP tool implementations.
//!
//! - `registry`: name to handler mapping and dispatch
//! - `schema`: argument schemas and validation
//! - `query`: the four database query tools
//! - `cloud`: the `aws` tool

pub mod cloud;
pub mod query;
pub mod registry;
pub mod schema;

pub use cloud::{CloudInvokeInput, CloudInvokeTool};
pub use query::{DatabaseQueryTool, QueryInput};
pub use registry::{ToolDescriptor, ToolHandler, ToolRegistry};
pub use schema::{ArgumentSchema, FieldKind, FieldSpec};

use crate::cloud::CloudInvoker;
use crate::db::QueryExecutor;
use crate::error::ToolResult;
use crate::models::{DatabaseTarget, QueryMode};
use std::sync::Arc;

/// Build the registry served over MCP.
///
/// Write tools are left out when `include_write_tools` is false.
pub fn build_registry(
    executor: QueryExecutor,
    invoker: Arc<CloudInvoker>,
    include_write_tools: bool,
) -> ToolResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    let cloud = CloudInvokeTool::new(invoker);
    registry.register(cloud.descriptor(), Arc::new(cloud))?;

    for target in DatabaseTarget::ALL {
        for mode in [QueryMode::ReadOnly, QueryMode::ReadWrite] {
            if mode == QueryMode::ReadWrite && !include_write_tools {
                continue;
            }
            let tool = DatabaseQueryTool::new(executor.clone(), target, mode);
            registry.register(DatabaseQueryTool::descriptor(target, mode), Arc::new(tool))?;
        }
    }

    Ok(registry)
}
