//! PostgreSQL backend for connection handles.
//!
//! Each target gets one dedicated `PgConnection` rather than a pool: the
//! transaction envelope is issued as plain statements, so every statement
//! of an envelope has to land on the same session.

use crate::db::connection::{Connector, SqlSession};
use crate::db::types::row_to_json;
use crate::error::{ToolError, ToolResult};
use crate::models::{JsonRow, TargetSettings};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::debug;

const APPLICATION_NAME: &str = "ops-mcp-server";

/// Opens `PgConnection`s.
#[derive(Debug, Clone, Default)]
pub struct PgConnector;

impl PgConnector {
    pub fn new() -> Self {
        Self
    }

    fn connect_options(settings: &TargetSettings) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database)
            .application_name(APPLICATION_NAME)
            // Agent-supplied SQL is never repeated verbatim often enough to cache
            .statement_cache_capacity(0)
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, settings: &TargetSettings) -> ToolResult<Box<dyn SqlSession>> {
        let conn = Self::connect_options(settings)
            .connect()
            .await
            .map_err(|e| {
                ToolError::connection(
                    format!("Failed to connect to {}: {}", settings.describe(), e),
                    connection_suggestion(&e),
                )
            })?;
        Ok(Box::new(PgSession { conn: Some(conn) }))
    }
}

/// A live PostgreSQL session.
pub struct PgSession {
    conn: Option<PgConnection>,
}

impl PgSession {
    fn conn(&mut self) -> ToolResult<&mut PgConnection> {
        self.conn.as_mut().ok_or_else(|| {
            ToolError::connection("Connection is closed", "Call the tool again to reconnect")
        })
    }
}

#[async_trait]
impl SqlSession for PgSession {
    async fn execute(&mut self, sql: &str) -> ToolResult<()> {
        // A bare &str runs over the simple query protocol, exactly as written
        let conn = self.conn()?;
        conn.execute(sql).await?;
        Ok(())
    }

    async fn fetch_all(&mut self, sql: &str) -> ToolResult<Vec<JsonRow>> {
        let conn = self.conn()?;
        let rows = conn.fetch_all(sql).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Error while closing PostgreSQL connection");
            }
        }
    }
}

fn connection_suggestion(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Io(_) => "Check that the database host and port are reachable",
        sqlx::Error::Tls(_) => "Verify TLS configuration and certificates",
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("28P01") => {
            "Check the database user and password"
        }
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("3D000") => {
            "Check that the configured database name exists"
        }
        _ => "Check the database host, port and credentials",
    }
}
