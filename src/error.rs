//! Error types for the ops MCP server.
//!
//! Every failure a tool call can produce is one `ToolError` variant. The
//! variant decides how the agent sees it: argument problems it can fix
//! itself, missing capabilities it cannot, and backend failures reported
//! after any rollback has already happened.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Invalid argument '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("Execution failed: {message}")]
    Execution {
        message: String,
        /// e.g., "23502" for not_null_violation
        sql_state: Option<String>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ToolError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a validation error naming the offending argument field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not found error, e.g. `not_found("Tool", "aws")`.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql_state,
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Connection { .. } => "connection",
            Self::Validation { .. } => "validation",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::NotFound { .. } => "not_found",
            Self::Execution { .. } => "execution",
            Self::Timeout { .. } => "timeout",
            Self::Internal { .. } => "internal",
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Validation { .. } => Some("Fix the named argument and call the tool again"),
            Self::InvalidArgument { .. } => {
                Some("Check that parametersJson is a valid JSON object for the operation")
            }
            Self::Timeout { .. } => Some("Narrow the query or add filters to reduce its cost"),
            _ => None,
        }
    }

    /// Check if the same call may succeed when repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors to ToolError.
///
/// Anything the server rejected is an execution error; anything that broke
/// the wire is a connection error.
impl From<sqlx::Error> for ToolError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => ToolError::connection(
                msg.to_string(),
                "Check the database host, port and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                ToolError::execution(db_err.message(), code)
            }
            sqlx::Error::Io(io_err) => ToolError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => ToolError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => ToolError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => ToolError::connection(
                "Connection is no longer available",
                "Call the tool again to reconnect",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                ToolError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => ToolError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => ToolError::internal("Database worker crashed"),
            other => ToolError::execution(other.to_string(), None),
        }
    }
}

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Build the `data` object attached to MCP errors.
fn error_data(err: &ToolError) -> serde_json::Value {
    let mut data = serde_json::json!({
        "kind": err.kind(),
        "retryable": err.is_retryable(),
    });
    match err {
        ToolError::Validation { field, .. } => {
            data["field"] = serde_json::Value::String(field.clone());
        }
        ToolError::Execution {
            sql_state: Some(code),
            ..
        } => {
            data["sql_state"] = serde_json::Value::String(code.clone());
        }
        _ => {}
    }
    if let Some(suggestion) = err.suggestion() {
        data["suggestion"] = serde_json::Value::String(suggestion.to_string());
    }
    data
}

/// Convert ToolError to MCP ErrorData for semantic error categorization.
impl From<ToolError> for rmcp::ErrorData {
    fn from(err: ToolError) -> Self {
        let data = Some(error_data(&err));
        match &err {
            // The agent can correct these and call again
            ToolError::Validation { .. } | ToolError::InvalidArgument { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            ToolError::NotFound { .. } => rmcp::ErrorData::resource_not_found(err.to_string(), data),

            // SQL and cloud API rejections -> invalid_params with sql_state in message
            ToolError::Execution { message, sql_state } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            ToolError::Configuration { .. }
            | ToolError::Connection { .. }
            | ToolError::Timeout { .. }
            | ToolError::Internal { .. } => rmcp::ErrorData::internal_error(err.to_string(), data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ToolError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));

        let err = ToolError::not_found("Client", "NoSuchService");
        assert_eq!(err.to_string(), "Client 'NoSuchService' not found");
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let invalid = ToolError::invalid_argument("bad json");
        let missing = ToolError::not_found("Operation", "listBucket");
        let failed = ToolError::execution("AccessDenied", None);
        assert_ne!(invalid.kind(), missing.kind());
        assert_ne!(invalid.kind(), failed.kind());
        assert_ne!(missing.kind(), failed.kind());
    }

    #[test]
    fn test_error_retryable() {
        assert!(ToolError::timeout("query", 30).is_retryable());
        assert!(ToolError::connection("err", "sugg").is_retryable());
        assert!(!ToolError::validation("query", "missing").is_retryable());
        assert!(!ToolError::execution("syntax error", None).is_retryable());
    }

    #[test]
    fn test_validation_maps_to_invalid_params_with_field() {
        let mcp_err: rmcp::ErrorData = ToolError::validation("query", "missing").into();
        assert_eq!(mcp_err.code.0, -32602);
        let data = mcp_err.data.unwrap();
        assert_eq!(data["kind"], "validation");
        assert_eq!(data["field"], "query");
    }

    #[test]
    fn test_invalid_argument_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = ToolError::invalid_argument("bad").into();
        assert_eq!(mcp_err.code.0, -32602);
        assert_eq!(mcp_err.data.unwrap()["kind"], "invalid_argument");
    }

    #[test]
    fn test_not_found_maps_to_resource_not_found() {
        let mcp_err: rmcp::ErrorData = ToolError::not_found("Tool", "nope").into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_execution_error_includes_sql_state() {
        let err = ToolError::execution("null value in column", Some("23502".to_string()));
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.message.contains("23502"));
        let data = mcp_err.data.unwrap();
        assert_eq!(data["sql_state"], "23502");
        assert_eq!(data["retryable"], false);
    }

    #[test]
    fn test_connection_maps_to_internal_error_with_suggestion() {
        let mcp_err: rmcp::ErrorData = ToolError::connection("failed", "try again").into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "try again");
        assert_eq!(data["retryable"], true);
    }

    #[test]
    fn test_timeout_maps_to_internal_error() {
        let mcp_err: rmcp::ErrorData = ToolError::timeout("query", 30).into();
        assert_eq!(mcp_err.code.0, -32603);
    }
}
