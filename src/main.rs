//! Ops MCP Server - Main entry point.
//!
//! Serves the `aws` tool and the four PostgreSQL query tools to an agent
//! runtime over stdio or streamable HTTP.

use clap::Parser;
use ops_mcp_server::auth::AuthConfig;
use ops_mcp_server::cloud::{CloudInvoker, ServiceCatalog};
use ops_mcp_server::config::{Config, TransportMode};
use ops_mcp_server::db::{ConnectionManager, PgConnector, QueryExecutor};
use ops_mcp_server::mcp::OpsService;
use ops_mcp_server::tools::build_registry;
use ops_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Output always goes to stderr.
fn init_tracing(config: &Config) {
    // Stdout belongs to the protocol under stdio; stay silent unless asked
    if config.transport == TransportMode::Stdio && !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting Ops MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    config.validate()?;
    let db_settings = match config.database_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("Both databases live on one PostgreSQL server:");
            eprintln!("  PG_HOST, PG_PORT, PG_USER, PG_PWD");
            eprintln!("  PG_REPORTING_DB_NAME, PG_GENERAL_DB_NAME");
            eprintln!();
            eprintln!("Example:");
            eprintln!(
                "  ops-mcp-server --pg-host db.internal --pg-user agent \
                 --reporting-db reporting --general-db general"
            );
            std::process::exit(1);
        }
    };

    // Connections open lazily on the first tool call
    let connections = ConnectionManager::new(db_settings, Arc::new(PgConnector::new()));
    let executor = QueryExecutor::new(connections.clone(), config.query_timeout_duration());
    let invoker = Arc::new(CloudInvoker::new(
        ServiceCatalog::aws()?,
        config.aws_region.trim(),
    ));

    let registry = build_registry(executor, invoker, !config.disable_write_tools)?;
    info!(
        tools = ?registry.names(),
        write_tools = !config.disable_write_tools,
        "Tool registry ready"
    );
    let service = OpsService::new(Arc::new(registry));

    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(service, connections);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let auth = AuthConfig::from_tokens(config.auth_tokens.clone())?;
            let transport = HttpTransport::new(
                service,
                connections,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .with_auth(auth);
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
