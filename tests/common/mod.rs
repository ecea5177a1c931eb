//! Fake database backend shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ops_mcp_server::config::DatabaseSettings;
use ops_mcp_server::db::{ConnectionManager, Connector, SqlSession};
use ops_mcp_server::error::{ToolError, ToolResult};
use ops_mcp_server::models::{JsonRow, TargetSettings};
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Statements seen by every session of one connector, tagged by database.
#[derive(Debug, Clone, Default)]
pub struct StatementLog(Arc<Mutex<Vec<(String, String)>>>);

impl StatementLog {
    pub fn push(&self, database: &str, sql: &str) {
        self.0
            .lock()
            .unwrap()
            .push((database.to_string(), sql.to_string()));
    }

    pub fn statements(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn statements_for(&self, database: &str) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(db, _)| db == database)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn count(&self, sql: &str) -> usize {
        self.statements().iter().filter(|s| *s == sql).count()
    }
}

/// Backend that records statements, fails those containing `fail_marker`
/// and answers every other query with `rows`.
#[derive(Clone)]
pub struct RecordingConnector {
    pub log: StatementLog,
    pub connects: Arc<AtomicUsize>,
    pub fail_marker: Option<String>,
    pub rows: Vec<JsonRow>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self {
            log: StatementLog::default(),
            connects: Arc::new(AtomicUsize::new(0)),
            fail_marker: None,
            rows: vec![row(json!({"x": 1}))],
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::new()
        }
    }

    pub fn with_rows(mut self, rows: Vec<JsonRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

struct RecordingSession {
    database: String,
    connector: RecordingConnector,
}

impl RecordingSession {
    fn run(&self, sql: &str) -> ToolResult<()> {
        self.connector.log.push(&self.database, sql);
        match &self.connector.fail_marker {
            Some(marker) if sql.contains(marker.as_str()) => Err(ToolError::execution(
                format!("statement rejected: {}", sql),
                Some("23502".to_string()),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SqlSession for RecordingSession {
    async fn execute(&mut self, sql: &str) -> ToolResult<()> {
        // Yield around every statement so concurrent callers get a chance to interleave
        tokio::task::yield_now().await;
        let result = self.run(sql);
        tokio::task::yield_now().await;
        result
    }

    async fn fetch_all(&mut self, sql: &str) -> ToolResult<Vec<JsonRow>> {
        tokio::task::yield_now().await;
        self.run(sql)?;
        tokio::task::yield_now().await;
        Ok(self.connector.rows.clone())
    }

    async fn close(&mut self) {}
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(&self, settings: &TargetSettings) -> ToolResult<Box<dyn SqlSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSession {
            database: settings.database.clone(),
            connector: self.clone(),
        }))
    }
}

pub fn row(value: JsonValue) -> JsonRow {
    value.as_object().cloned().unwrap_or_default()
}

fn target(database: &str) -> TargetSettings {
    TargetSettings {
        host: "localhost".to_string(),
        port: 5432,
        user: "agent".to_string(),
        password: "secret".to_string(),
        database: database.to_string(),
    }
}

pub fn settings() -> DatabaseSettings {
    DatabaseSettings {
        reporting: target("reporting"),
        general: target("general"),
        connect_timeout: Duration::from_secs(5),
    }
}

pub fn manager(connector: &RecordingConnector) -> ConnectionManager {
    ConnectionManager::new(settings(), Arc::new(connector.clone()))
}
