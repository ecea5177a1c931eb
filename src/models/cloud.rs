//! Cloud invocation request model.

use serde::{Deserialize, Serialize};

/// One by-name call against the cloud SDK surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudInvocation {
    /// Service client name, e.g. `S3` or `CostExplorer`
    pub client_class_name: String,
    /// Case-sensitive operation name, e.g. `listBuckets`
    pub method_name: String,
    /// Operation parameters as JSON text
    pub parameters_json: String,
    /// Region for this call only; the configured default applies when absent
    #[serde(default)]
    pub region: Option<String>,
}

impl CloudInvocation {
    pub fn new(
        client_class_name: impl Into<String>,
        method_name: impl Into<String>,
        parameters_json: impl Into<String>,
    ) -> Self {
        Self {
            client_class_name: client_class_name.into(),
            method_name: method_name.into(),
            parameters_json: parameters_json.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}
