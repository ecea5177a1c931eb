//! Streamable HTTP transport, optionally behind bearer authentication.

use super::wait_for_signal;
use crate::auth::{AuthConfig, auth_middleware};
use crate::db::ConnectionManager;
use crate::error::{ToolError, ToolResult};
use crate::mcp::OpsService;
use crate::transport::Transport;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// How long open streams may linger after a shutdown signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    service: OpsService,
    connections: ConnectionManager,
    auth: Arc<AuthConfig>,
    host: String,
    port: u16,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        service: OpsService,
        connections: ConnectionManager,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            service,
            connections,
            auth: Arc::new(AuthConfig::disabled()),
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    /// Require a bearer token on every request when `auth` is enabled.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Axum router serving the MCP endpoint.
    pub fn router(&self) -> axum::Router {
        let service = self.service.clone();
        let mcp = StreamableHttpService::new(
            move || Ok(service.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects the root path
        let router = if self.endpoint == "/" {
            axum::Router::new().fallback_service(mcp)
        } else {
            axum::Router::new().nest_service(&self.endpoint, mcp)
        };

        if self.auth.is_enabled() {
            info!(tokens = self.auth.token_count(), "Bearer authentication enabled");
            router.layer(axum::middleware::from_fn_with_state(
                self.auth.clone(),
                auth_middleware,
            ))
        } else {
            router
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> ToolResult<()> {
        let bind_addr = self.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            ToolError::connection(
                format!("Cannot listen on {}: {}", bind_addr, e),
                "Choose a free address with --http-host / --http-port",
            )
        })?;
        info!(addr = %bind_addr, endpoint = %self.endpoint, "Serving MCP over streamable HTTP");

        let (stopping_tx, mut stopping_rx) = watch::channel(false);
        let server = axum::serve(listener, self.router()).with_graceful_shutdown(async move {
            wait_for_signal().await;
            let _ = stopping_tx.send(true);
        });

        // Open SSE streams hold graceful shutdown; bound the drain
        let drain_limit = async {
            if stopping_rx.wait_for(|stopping| *stopping).await.is_err() {
                return std::future::pending().await;
            }
            info!(
                limit_secs = GRACEFUL_TIMEOUT.as_secs(),
                "Draining open streams, signal again to stop now"
            );
            tokio::select! {
                _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => warn!("Drain limit reached"),
                _ = wait_for_signal() => warn!("Second signal, stopping now"),
            }
        };

        let outcome = tokio::select! {
            result = server => result.map_err(|e| {
                error!(error = %e, "HTTP server failed");
                ToolError::internal(format!("HTTP server failed: {}", e))
            }),
            _ = drain_limit => Ok(()),
        };

        self.connections.close_all().await;
        info!("HTTP transport stopped");
        outcome
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
