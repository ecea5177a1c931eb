//! Stdio transport for the MCP server.
//!
//! Reads JSON-RPC messages from stdin and writes responses to stdout.
//! Logs go to stderr, so stdout carries protocol traffic only.

use super::wait_for_signal;
use crate::db::ConnectionManager;
use crate::error::{ToolError, ToolResult};
use crate::mcp::OpsService;
use crate::transport::Transport;
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

pub struct StdioTransport {
    service: OpsService,
    connections: ConnectionManager,
}

impl StdioTransport {
    /// `connections` are closed when the transport stops.
    pub fn new(service: OpsService, connections: ConnectionManager) -> Self {
        Self {
            service,
            connections,
        }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> ToolResult<()> {
        info!("Starting MCP server with stdio transport");

        let running_service = self
            .service
            .clone()
            .serve(stdio())
            .await
            .map_err(|e| ToolError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => info!("Stdio transport completed normally"),
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.connections.close_all().await;
                        return Err(ToolError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database connections");
        self.connections.close_all().await;

        if shutdown_requested {
            // The stdin reader blocks and cannot be interrupted by select!
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
