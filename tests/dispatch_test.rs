//! Integration tests for tool registration and dispatch.

mod common;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use common::{RecordingConnector, manager};
use ops_mcp_server::cloud::{CloudInvoker, ServiceCatalog};
use ops_mcp_server::db::QueryExecutor;
use ops_mcp_server::error::ToolError;
use ops_mcp_server::tools::{ToolRegistry, build_registry};
use rmcp::model::JsonObject;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;

fn offline_invoker() -> Arc<CloudInvoker> {
    let config = SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("ap-southeast-1"))
        .build();
    Arc::new(CloudInvoker::with_sdk_config(
        ServiceCatalog::aws().unwrap(),
        "ap-southeast-1",
        config,
    ))
}

fn registry(connector: &RecordingConnector, include_write_tools: bool) -> ToolRegistry {
    let executor = QueryExecutor::new(manager(connector), Duration::from_secs(30));
    build_registry(executor, offline_invoker(), include_write_tools).unwrap()
}

fn args(value: JsonValue) -> Option<JsonObject> {
    value.as_object().cloned()
}

#[test]
fn test_full_tool_surface() {
    let registry = registry(&RecordingConnector::new(), true);
    assert_eq!(
        registry.names(),
        vec![
            "aws",
            "database_query_readonly_reporting",
            "database_query_write_reporting",
            "database_query_readonly_general",
            "database_query_write_general",
        ]
    );
}

#[test]
fn test_write_tools_can_be_disabled() {
    let registry = registry(&RecordingConnector::new(), false);
    assert_eq!(
        registry.names(),
        vec![
            "aws",
            "database_query_readonly_reporting",
            "database_query_readonly_general",
        ]
    );
}

#[tokio::test]
async fn test_unknown_tool_is_not_found_without_side_effects() {
    let connector = RecordingConnector::new();
    let registry = registry(&connector, true);

    let err = registry
        .dispatch("database_query_readonly_every", args(json!({"query": "SELECT 1"})))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ToolError::not_found("Tool", "database_query_readonly_every")
    );
    assert_eq!(connector.connect_count(), 0);
}

#[tokio::test]
async fn test_missing_query_fails_validation_before_connecting() {
    let connector = RecordingConnector::new();
    let registry = registry(&connector, true);

    let err = registry
        .dispatch("database_query_write_general", args(json!({"sql": "DELETE FROM t"})))
        .await
        .unwrap_err();

    assert_eq!(err, ToolError::validation("query", "is required"));
    assert_eq!(connector.connect_count(), 0);
    assert!(connector.log.statements().is_empty());
}

#[tokio::test]
async fn test_non_string_query_fails_validation() {
    let connector = RecordingConnector::new();
    let registry = registry(&connector, true);

    let err = registry
        .dispatch("database_query_readonly_general", args(json!({"query": 1})))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert_eq!(connector.connect_count(), 0);
}

#[tokio::test]
async fn test_readonly_query_returns_rows() {
    let connector = RecordingConnector::new();
    let registry = registry(&connector, true);

    let result = registry
        .dispatch(
            "database_query_readonly_reporting",
            args(json!({"query": "SELECT 1 AS x", "ignored": true})),
        )
        .await
        .unwrap();

    assert_eq!(result, json!([{"x": 1}]));
    assert_eq!(
        connector.log.statements_for("reporting"),
        vec!["BEGIN READ ONLY", "SELECT 1 AS x", "COMMIT"]
    );
}

#[tokio::test]
async fn test_write_tool_failure_surfaces_execution_error() {
    let connector = RecordingConnector::failing_on("INSERT");
    let registry = registry(&connector, true);

    let err = registry
        .dispatch(
            "database_query_write_reporting",
            args(json!({"query": "INSERT INTO t (name) VALUES (NULL)"})),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "execution");
    assert_eq!(connector.log.count("ROLLBACK"), 1);
    assert_eq!(connector.log.count("COMMIT"), 0);
}

#[tokio::test]
async fn test_aws_unknown_client_is_not_found() {
    let registry = registry(&RecordingConnector::new(), true);

    let err = registry
        .dispatch(
            "aws",
            args(json!({
                "clientClassName": "NoSuchService",
                "methodName": "listBuckets",
                "parametersJson": "{}"
            })),
        )
        .await
        .unwrap_err();

    assert_eq!(err, ToolError::not_found("Client", "NoSuchService"));
}

#[tokio::test]
async fn test_aws_bad_json_is_invalid_argument() {
    let registry = registry(&RecordingConnector::new(), true);

    let err = registry
        .dispatch(
            "aws",
            args(json!({
                "clientClassName": "S3",
                "methodName": "listBuckets",
                "parametersJson": "{bad"
            })),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_argument");
}

#[tokio::test]
async fn test_aws_missing_method_name_fails_validation() {
    let registry = registry(&RecordingConnector::new(), true);

    let err = registry
        .dispatch(
            "aws",
            args(json!({"clientClassName": "S3", "parametersJson": "{}"})),
        )
        .await
        .unwrap_err();

    assert_eq!(err, ToolError::validation("methodName", "is required"));
}
