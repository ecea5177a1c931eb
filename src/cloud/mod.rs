//! By-name invocation of cloud SDK operations.
//!
//! Agents name a service client and an operation as plain strings. Both are
//! resolved through lookup tables built at startup:
//!
//! - `ServiceCatalog`: service name -> operation list and client factory
//! - each `CloudClient`: operation name -> typed SDK call
//!
//! Parameters arrive as JSON text and are decoded into the operation's typed
//! input only after the service and operation are known to exist.

pub mod cost_explorer;
pub mod s3;
pub mod sts;

use crate::error::{ToolError, ToolResult};
use crate::models::CloudInvocation;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_smithy_types::date_time::{DateTime, Format};
use aws_smithy_types::error::display::DisplayErrorContext;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// A constructed service client able to run its operations by name.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Run `operation` with already-parsed JSON parameters.
    async fn call(&self, operation: &str, params: JsonValue) -> ToolResult<JsonValue>;
}

/// Builds a client bound to one region's configuration.
pub type ClientFactory = Arc<dyn Fn(&SdkConfig) -> Arc<dyn CloudClient> + Send + Sync>;

/// One service in the catalog.
#[derive(Clone)]
pub struct ServiceEntry {
    operations: &'static [&'static str],
    factory: ClientFactory,
}

impl ServiceEntry {
    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.contains(&name)
    }

    fn build(&self, config: &SdkConfig) -> Arc<dyn CloudClient> {
        (self.factory)(config)
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

/// Service name to client factory table.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: BTreeMap<String, ServiceEntry>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the built-in AWS services.
    pub fn aws() -> ToolResult<Self> {
        Self::new()
            .with_service(s3::SERVICE_NAME, s3::OPERATIONS, Arc::new(s3::client))?
            .with_service(
                cost_explorer::SERVICE_NAME,
                cost_explorer::OPERATIONS,
                Arc::new(cost_explorer::client),
            )?
            .with_service(sts::SERVICE_NAME, sts::OPERATIONS, Arc::new(sts::client))
    }

    /// Add a service. Names are unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        operations: &'static [&'static str],
        factory: ClientFactory,
    ) -> ToolResult<()> {
        let name = name.into();
        if self.services.contains_key(&name) {
            return Err(ToolError::configuration(format!(
                "Cloud service '{}' is registered twice",
                name
            )));
        }
        self.services.insert(name, ServiceEntry { operations, factory });
        Ok(())
    }

    pub fn with_service(
        mut self,
        name: impl Into<String>,
        operations: &'static [&'static str],
        factory: ClientFactory,
    ) -> ToolResult<Self> {
        self.register(name, operations, factory)?;
        Ok(self)
    }

    /// Look up a service by its exact name.
    pub fn resolve(&self, name: &str) -> ToolResult<&ServiceEntry> {
        self.services
            .get(name)
            .ok_or_else(|| ToolError::not_found("Client", name))
    }

    /// Services and their operations, sorted by service name.
    pub fn services(&self) -> impl Iterator<Item = (&str, &'static [&'static str])> {
        self.services
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.operations))
    }

    /// One line per service, e.g. `STS: getCallerIdentity`.
    pub fn summary(&self) -> String {
        self.services()
            .map(|(name, ops)| format!("{}: {}", name, ops.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Resolves and runs `CloudInvocation`s.
pub struct CloudInvoker {
    catalog: ServiceCatalog,
    default_region: String,
    base_config: OnceCell<SdkConfig>,
}

impl CloudInvoker {
    /// Create an invoker whose shared SDK configuration (credentials chain,
    /// retry policy) is loaded from the environment on first use.
    pub fn new(catalog: ServiceCatalog, default_region: impl Into<String>) -> Self {
        Self {
            catalog,
            default_region: default_region.into(),
            base_config: OnceCell::new(),
        }
    }

    /// Create an invoker with a preloaded SDK configuration.
    pub fn with_sdk_config(
        catalog: ServiceCatalog,
        default_region: impl Into<String>,
        config: SdkConfig,
    ) -> Self {
        Self {
            catalog,
            default_region: default_region.into(),
            base_config: OnceCell::new_with(Some(config)),
        }
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    /// Run one invocation and return the operation's response as JSON.
    ///
    /// Unknown services and operations are `NotFound`; unparsable or
    /// ill-shaped parameters are `InvalidArgument`; API rejections are
    /// `Execution`.
    pub async fn invoke(&self, invocation: &CloudInvocation) -> ToolResult<JsonValue> {
        let entry = self.catalog.resolve(&invocation.client_class_name)?;
        let region = self.region_for(invocation);

        let config = self.regional_config(region).await;
        let client = entry.build(&config);

        if !entry.has_operation(&invocation.method_name) {
            return Err(unknown_operation(
                &invocation.client_class_name,
                &invocation.method_name,
            ));
        }

        let params: JsonValue = serde_json::from_str(&invocation.parameters_json).map_err(|e| {
            ToolError::invalid_argument(format!("Invalid JSON parameters provided: {}", e))
        })?;

        debug!(
            client = %invocation.client_class_name,
            method = %invocation.method_name,
            region = %region,
            "Invoking cloud operation"
        );

        match client.call(&invocation.method_name, params).await {
            Ok(response) => {
                info!(
                    client = %invocation.client_class_name,
                    method = %invocation.method_name,
                    region = %region,
                    "Cloud operation succeeded"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(
                    client = %invocation.client_class_name,
                    method = %invocation.method_name,
                    region = %region,
                    error = %e,
                    "Cloud operation failed"
                );
                Err(e)
            }
        }
    }

    fn region_for<'a>(&'a self, invocation: &'a CloudInvocation) -> &'a str {
        invocation
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_region.as_str())
    }

    async fn regional_config(&self, region: &str) -> SdkConfig {
        let base = self
            .base_config
            .get_or_init(|| async {
                info!(region = %self.default_region, "Loading AWS SDK configuration");
                aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.default_region.clone()))
                    .load()
                    .await
            })
            .await;
        base.to_builder()
            .region(Region::new(region.to_string()))
            .build()
    }
}

impl std::fmt::Debug for CloudInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudInvoker")
            .field("catalog", &self.catalog)
            .field("default_region", &self.default_region)
            .field("config_loaded", &self.base_config.initialized())
            .finish()
    }
}

// =============================================================================
// Helpers shared by the service modules
// =============================================================================

/// Decode an operation's parameters into its typed input.
pub(crate) fn decode_params<T: DeserializeOwned>(
    operation: &str,
    params: JsonValue,
) -> ToolResult<T> {
    serde_json::from_value(params).map_err(|e| {
        ToolError::invalid_argument(format!("Invalid parameters for {}: {}", operation, e))
    })
}

/// Map an SDK failure to an execution error carrying the full error chain.
pub(crate) fn api_error<E: std::error::Error>(
    service: &str,
    operation: &str,
    err: E,
) -> ToolError {
    ToolError::execution(
        format!("{}.{} failed: {}", service, operation, DisplayErrorContext(&err)),
        None,
    )
}

pub(crate) fn unknown_operation(service: &str, operation: &str) -> ToolError {
    ToolError::not_found(format!("{} command", service), operation)
}

/// ISO-8601 rendering of an SDK timestamp.
pub(crate) fn timestamp(value: Option<&DateTime>) -> JsonValue {
    value
        .and_then(|dt| dt.fmt(Format::DateTime).ok())
        .map(JsonValue::String)
        .unwrap_or(JsonValue::Null)
}

/// Empty parameter object for operations without inputs.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NoParams {}
