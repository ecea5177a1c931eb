//! Query-related data models.
//!
//! This module defines types for transactional SQL requests and results.

use crate::models::DatabaseTarget;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// One result row: column name to value, in column order.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// Transaction mode for a single statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    ReadOnly,
    ReadWrite,
}

impl QueryMode {
    /// Statement that opens the transaction envelope for this mode.
    pub fn begin_statement(&self) -> &'static str {
        match self {
            Self::ReadOnly => "BEGIN READ ONLY",
            Self::ReadWrite => "BEGIN",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "readonly",
            Self::ReadWrite => "write",
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub target: DatabaseTarget,
    /// Executed verbatim
    pub sql: String,
    pub mode: QueryMode,
}

impl QueryRequest {
    pub fn new(target: DatabaseTarget, sql: impl Into<String>, mode: QueryMode) -> Self {
        Self {
            target,
            sql: sql.into(),
            mode,
        }
    }

    pub fn read_only(target: DatabaseTarget, sql: impl Into<String>) -> Self {
        Self::new(target, sql, QueryMode::ReadOnly)
    }

    pub fn read_write(target: DatabaseTarget, sql: impl Into<String>) -> Self {
        Self::new(target, sql, QueryMode::ReadWrite)
    }
}

/// Result of a committed statement. All rows are held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<JsonRow>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn into_rows(self) -> Vec<JsonRow> {
        self.rows
    }
}
