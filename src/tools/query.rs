//! Database query tools.
//!
//! Four tools share one handler type: read-only and write variants for the
//! reporting and general databases. Each runs the agent's SQL verbatim in
//! its own transaction envelope and returns the rows as JSON objects.

use crate::db::QueryExecutor;
use crate::error::{ToolError, ToolResult};
use crate::models::{DatabaseTarget, QueryMode, QueryRequest};
use crate::tools::registry::{ToolDescriptor, ToolHandler};
use crate::tools::schema::ArgumentSchema;
use async_trait::async_trait;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Input for the database query tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute as written (PostgreSQL dialect)
    pub query: String,
}

const WRITE_DESCRIPTION: &str = "DANGEROUS operation that writes to the {db} database. \
You MUST triple check with the user before using this tool - show them the query you are about to run.";

/// Runs `query` against one target in one mode.
#[derive(Debug, Clone)]
pub struct DatabaseQueryTool {
    executor: QueryExecutor,
    target: DatabaseTarget,
    mode: QueryMode,
}

impl DatabaseQueryTool {
    pub fn new(executor: QueryExecutor, target: DatabaseTarget, mode: QueryMode) -> Self {
        Self {
            executor,
            target,
            mode,
        }
    }

    /// Tool name, e.g. `database_query_readonly_reporting`.
    pub fn tool_name(target: DatabaseTarget, mode: QueryMode) -> String {
        format!("database_query_{}_{}", mode.as_str(), target.as_str())
    }

    pub fn descriptor(target: DatabaseTarget, mode: QueryMode) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::tool_name(target, mode),
            description(target, mode),
            ArgumentSchema::for_type::<QueryInput>(),
        )
    }
}

fn description(target: DatabaseTarget, mode: QueryMode) -> String {
    match (mode, target) {
        (QueryMode::ReadOnly, DatabaseTarget::Reporting) => {
            "Readonly database query for PostgreSQL (reporting DB), use this if there are no direct tools"
                .to_string()
        }
        (QueryMode::ReadOnly, DatabaseTarget::General) => {
            "Readonly database query for PostgreSQL (general DB). For payment and transaction \
related queries, use tables: vw_payment_details and vw_transaction_details. IMPORTANT: Before \
filtering by 'payment_status' or 'transaction_status', ALWAYS query the DISTINCT available \
statuses from the relevant table first (e.g., 'SELECT DISTINCT payment_status FROM \
vw_payment_details;'). Do NOT assume common status values like 'SUCCESS', as they may not \
exist. Time in database is in UTC."
                .to_string()
        }
        (QueryMode::ReadWrite, target) => WRITE_DESCRIPTION.replace("{db}", target.as_str()),
    }
}

#[async_trait]
impl ToolHandler for DatabaseQueryTool {
    async fn call(&self, args: JsonObject) -> ToolResult<JsonValue> {
        let input: QueryInput = serde_json::from_value(JsonValue::Object(args))
            .map_err(|e| ToolError::validation("query", e.to_string()))?;

        let request = QueryRequest::new(self.target, input.query, self.mode);
        let result = self.executor.execute(&request).await?;

        Ok(JsonValue::Array(
            result.into_rows().into_iter().map(JsonValue::Object).collect(),
        ))
    }
}
