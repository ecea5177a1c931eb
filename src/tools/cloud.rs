//! The `aws` tool: by-name calls into the AWS SDK.

use crate::cloud::CloudInvoker;
use crate::error::{ToolError, ToolResult};
use crate::models::CloudInvocation;
use crate::tools::registry::{ToolDescriptor, ToolHandler};
use crate::tools::schema::ArgumentSchema;
use async_trait::async_trait;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const TOOL_NAME: &str = "aws";

/// Input for the `aws` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudInvokeInput {
    /// Class name of the client to use (e.g., 'S3', 'CostExplorer')
    pub client_class_name: String,
    /// Function to call on the AWS SDK client, in lowerCamelCase (e.g., 'listBuckets', 'getCostAndUsage')
    pub method_name: String,
    /// Arguments to pass to the command as JSON, with PascalCase keys (e.g., '{"Bucket": "my-bucket"}')
    pub parameters_json: String,
    /// AWS region for this call only. Defaults to the server's configured region.
    #[serde(default)]
    pub region: Option<String>,
}

impl From<CloudInvokeInput> for CloudInvocation {
    fn from(input: CloudInvokeInput) -> Self {
        Self {
            client_class_name: input.client_class_name,
            method_name: input.method_name,
            parameters_json: input.parameters_json,
            region: input.region,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloudInvokeTool {
    invoker: Arc<CloudInvoker>,
}

impl CloudInvokeTool {
    pub fn new(invoker: Arc<CloudInvoker>) -> Self {
        Self { invoker }
    }

    /// Descriptor listing the clients and commands the invoker knows.
    pub fn descriptor(&self) -> ToolDescriptor {
        let description = format!(
            "Make a call to the AWS SDK. NOTE: Command names must be in lowerCamelCase \
(e.g., 'getCostAndUsage') and parameter keys in PascalCase. Default region: {}.\n\
Available clients and commands:\n{}",
            self.invoker.default_region(),
            self.invoker.catalog().summary()
        );
        ToolDescriptor::new(
            TOOL_NAME,
            description,
            ArgumentSchema::for_type::<CloudInvokeInput>(),
        )
    }
}

#[async_trait]
impl ToolHandler for CloudInvokeTool {
    async fn call(&self, args: JsonObject) -> ToolResult<JsonValue> {
        let input: CloudInvokeInput = serde_json::from_value(JsonValue::Object(args))
            .map_err(|e| ToolError::validation("arguments", e.to_string()))?;
        self.invoker.invoke(&input.into()).await
    }
}
