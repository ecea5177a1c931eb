//! Configuration handling for the ops MCP server.
//!
//! All settings come from CLI arguments or environment variables and are
//! fixed for the lifetime of the process. Database credentials are resolved
//! here once; tool calls never supply connection parameters.

use crate::error::{ToolError, ToolResult};
use crate::models::{DatabaseTarget, TargetSettings};
use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_AWS_REGION: &str = "ap-southeast-1";

/// How the server talks to its MCP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// JSON-RPC over stdin/stdout, spawned by a local agent runtime
    #[default]
    Stdio,
    /// Streamable HTTP (for remote agents)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Resolved settings for both logical databases.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub reporting: TargetSettings,
    pub general: TargetSettings,
    pub connect_timeout: Duration,
}

impl DatabaseSettings {
    pub fn for_target(&self, target: DatabaseTarget) -> &TargetSettings {
        match target {
            DatabaseTarget::Reporting => &self.reporting,
            DatabaseTarget::General => &self.general,
        }
    }
}

/// Configuration for the ops MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ops-mcp-server",
    about = "MCP server exposing AWS SDK calls and transactional PostgreSQL query tools",
    version,
    author
)]
pub struct Config {
    /// PostgreSQL host shared by both databases
    #[arg(long, env = "PG_HOST", default_value = "")]
    pub pg_host: String,

    /// PostgreSQL port
    #[arg(long, env = "PG_PORT", default_value_t = DEFAULT_PG_PORT)]
    pub pg_port: u16,

    /// PostgreSQL user
    #[arg(long, env = "PG_USER", default_value = "")]
    pub pg_user: String,

    /// PostgreSQL password (sensitive - not logged)
    #[arg(long, env = "PG_PWD", default_value = "", hide_env_values = true)]
    pub pg_password: String,

    /// Database name of the reporting database
    #[arg(long, env = "PG_REPORTING_DB_NAME", default_value = "")]
    pub reporting_db: String,

    /// Database name of the general database
    #[arg(long, env = "PG_GENERAL_DB_NAME", default_value = "")]
    pub general_db: String,

    /// Default AWS region for cloud calls without a region override
    #[arg(long, env = "MCP_AWS_REGION", default_value = DEFAULT_AWS_REGION)]
    pub aws_region: String,

    /// Do not register the database write tools
    #[arg(long, env = "MCP_DISABLE_WRITE_TOOLS")]
    pub disable_write_tools: bool,

    /// Transport to serve on
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// Listen address for the http transport
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// Listen port for the http transport
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// Path the MCP endpoint is mounted on (http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Bearer tokens accepted by the http transport. Repeat the flag or pass
    /// a comma-separated list; with none set, requests are not authenticated.
    #[arg(
        long = "auth-token",
        value_name = "TOKEN",
        env = "MCP_AUTH_TOKENS",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub auth_tokens: Vec<String>,

    /// Statement timeout in seconds (covers BEGIN through COMMIT)
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Seconds to wait when opening a database connection
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Tracing filter when RUST_LOG is unset, e.g. `info` or `ops_mcp_server=debug`
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Log under the stdio transport too (always to stderr)
    #[arg(long, env = "MCP_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// All defaults, with the database section left blank.
    pub fn default_config() -> Self {
        Self {
            pg_host: String::new(),
            pg_port: DEFAULT_PG_PORT,
            pg_user: String::new(),
            pg_password: String::new(),
            reporting_db: String::new(),
            general_db: String::new(),
            aws_region: DEFAULT_AWS_REGION.to_string(),
            disable_write_tools: false,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            auth_tokens: Vec::new(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Validate the database section and resolve settings for both targets.
    pub fn database_settings(&self) -> ToolResult<DatabaseSettings> {
        require("pg-host", &self.pg_host)?;
        require("pg-user", &self.pg_user)?;
        require("reporting-db", &self.reporting_db)?;
        require("general-db", &self.general_db)?;
        if self.pg_port == 0 {
            return Err(ToolError::configuration("pg-port must be greater than 0"));
        }
        if self.connect_timeout == 0 {
            return Err(ToolError::configuration(
                "connect-timeout must be greater than 0",
            ));
        }

        let target = |database: &str| TargetSettings {
            host: self.pg_host.trim().to_string(),
            port: self.pg_port,
            user: self.pg_user.trim().to_string(),
            password: self.pg_password.clone(),
            database: database.trim().to_string(),
        };

        Ok(DatabaseSettings {
            reporting: target(&self.reporting_db),
            general: target(&self.general_db),
            connect_timeout: self.connect_timeout_duration(),
        })
    }

    /// Validate settings that are independent of the databases.
    pub fn validate(&self) -> ToolResult<()> {
        require("aws-region", &self.aws_region)?;
        if self.query_timeout == 0 {
            return Err(ToolError::configuration(
                "query-timeout must be greater than 0",
            ));
        }
        if self.auth_tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ToolError::configuration(
                "auth-token values must not be blank",
            ));
        }
        Ok(())
    }

    /// Budget for one transaction envelope.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn require(name: &str, value: &str) -> ToolResult<()> {
    if value.trim().is_empty() {
        Err(ToolError::configuration(format!("{name} is required")))
    } else {
        Ok(())
    }
}
