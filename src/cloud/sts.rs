//! AWS Security Token Service operations.

use super::{CloudClient, NoParams, api_error, decode_params, unknown_operation};
use crate::error::ToolResult;
use async_trait::async_trait;
use aws_config::SdkConfig;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

pub const SERVICE_NAME: &str = "STS";

pub const OPERATIONS: &[&str] = &["getCallerIdentity"];

pub fn client(config: &SdkConfig) -> Arc<dyn CloudClient> {
    Arc::new(StsService {
        client: aws_sdk_sts::Client::new(config),
    })
}

struct StsService {
    client: aws_sdk_sts::Client,
}

#[async_trait]
impl CloudClient for StsService {
    async fn call(&self, operation: &str, params: JsonValue) -> ToolResult<JsonValue> {
        match operation {
            "getCallerIdentity" => {
                let NoParams {} = decode_params(operation, params)?;
                let output = self
                    .client
                    .get_caller_identity()
                    .send()
                    .await
                    .map_err(|e| api_error(SERVICE_NAME, operation, e))?;
                Ok(json!({
                    "UserId": output.user_id(),
                    "Account": output.account(),
                    "Arn": output.arn(),
                }))
            }
            other => Err(unknown_operation(SERVICE_NAME, other)),
        }
    }
}
