//! Transactional statement execution.
//!
//! Every statement runs inside its own envelope on the target's session:
//!
//! ```text
//! BEGIN [READ ONLY] -> statement -> COMMIT
//!                          \-> (any failure) ROLLBACK
//! ```
//!
//! The session lock is held for the whole envelope, so two calls against the
//! same target never interleave their transactions.

use crate::db::connection::{ConnectionManager, SessionGuard};
use crate::error::{ToolError, ToolResult};
use crate::models::{JsonRow, QueryRequest, QueryResult};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Upper bound for the cleanup ROLLBACK after a failed envelope.
const ROLLBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs statements inside transaction envelopes.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    connections: ConnectionManager,
    statement_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(connections: ConnectionManager, statement_timeout: Duration) -> Self {
        Self {
            connections,
            statement_timeout,
        }
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Execute one statement and return its rows once committed.
    ///
    /// On failure the transaction is rolled back and the error that caused
    /// the rollback is returned unchanged.
    pub async fn execute(&self, request: &QueryRequest) -> ToolResult<QueryResult> {
        let start = Instant::now();
        let handle = self.connections.handle(request.target);
        let mut session = handle.acquire().await?;

        debug!(
            target_db = %request.target,
            mode = %request.mode,
            sql = %request.sql,
            timeout_secs = self.statement_timeout.as_secs(),
            "Executing statement"
        );

        let outcome = timeout(self.statement_timeout, run_envelope(&mut session, request))
            .await
            .unwrap_or_else(|_| {
                Err(ToolError::timeout(
                    format!("{} statement on the {} database", request.mode, request.target),
                    self.statement_timeout.as_secs(),
                ))
            });

        match outcome {
            Ok(rows) => {
                let result = QueryResult {
                    rows,
                    execution_time_ms: start.elapsed().as_millis() as u64,
                };
                info!(
                    target_db = %request.target,
                    mode = %request.mode,
                    rows = result.row_count(),
                    elapsed_ms = result.execution_time_ms,
                    "Statement committed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    target_db = %request.target,
                    mode = %request.mode,
                    error = %e,
                    "Statement failed, rolling back"
                );
                rollback(&mut session).await;
                Err(e)
            }
        }
    }
}

/// Steps between BEGIN and COMMIT inclusive. Never issues ROLLBACK.
async fn run_envelope(
    session: &mut SessionGuard<'_>,
    request: &QueryRequest,
) -> ToolResult<Vec<JsonRow>> {
    session.execute(request.mode.begin_statement()).await?;
    let rows = session.fetch_all(&request.sql).await?;
    session.execute("COMMIT").await?;
    Ok(rows)
}

/// Best-effort ROLLBACK. A session that cannot roll back is discarded.
async fn rollback(session: &mut SessionGuard<'_>) {
    let outcome = timeout(ROLLBACK_TIMEOUT, session.execute("ROLLBACK")).await;
    match outcome {
        Ok(Ok(())) => debug!(target_db = %session.target(), "Rolled back"),
        Ok(Err(e)) => {
            warn!(target_db = %session.target(), error = %e, "Rollback failed");
            session.discard().await;
        }
        Err(_) => {
            warn!(target_db = %session.target(), "Rollback timed out");
            session.discard().await;
        }
    }
}
