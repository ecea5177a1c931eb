//! Lazy, memoized database connections.
//!
//! Each logical target owns exactly one `ConnectionHandle`. The handle keeps
//! a single session behind an async mutex: the first caller opens it while
//! holding the lock, so concurrent first calls wait on that attempt instead
//! of connecting twice. The same lock serializes transactions, since the
//! wire protocol cannot interleave two transactions on one session.

use crate::config::DatabaseSettings;
use crate::error::{ToolError, ToolResult};
use crate::models::{ConnectionState, DatabaseTarget, JsonRow, TargetSettings};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// An open session on one database.
#[async_trait]
pub trait SqlSession: Send {
    /// Run a statement and discard any rows (transaction control).
    async fn execute(&mut self, sql: &str) -> ToolResult<()>;

    /// Run a statement and return every row it produced.
    async fn fetch_all(&mut self, sql: &str) -> ToolResult<Vec<JsonRow>>;

    /// Close the session, ignoring errors. The session is unusable afterwards.
    async fn close(&mut self);
}

/// Opens sessions for a target's settings.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &TargetSettings) -> ToolResult<Box<dyn SqlSession>>;
}

type SessionSlot = Option<Box<dyn SqlSession>>;

/// One logical database target and its lazily opened session.
pub struct ConnectionHandle {
    target: DatabaseTarget,
    settings: TargetSettings,
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    session: Mutex<SessionSlot>,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionHandle {
    pub fn new(
        target: DatabaseTarget,
        settings: TargetSettings,
        connector: Arc<dyn Connector>,
        connect_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Uninitialized);
        Self {
            target,
            settings,
            connector,
            connect_timeout,
            session: Mutex::new(None),
            state,
        }
    }

    pub fn target(&self) -> DatabaseTarget {
        self.target
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Open the session if it is not open yet. No-op once Ready.
    pub async fn ensure_ready(&self) -> ToolResult<()> {
        let mut slot = self.session.lock().await;
        self.connect_locked(&mut slot).await
    }

    /// Take exclusive use of the session, connecting first when needed.
    ///
    /// The returned guard holds the handle's lock until dropped.
    pub async fn acquire(&self) -> ToolResult<SessionGuard<'_>> {
        let mut slot = self.session.lock().await;
        self.connect_locked(&mut slot).await?;
        Ok(SessionGuard { handle: self, slot })
    }

    /// Close the session, returning the handle to Uninitialized.
    pub async fn close(&self) {
        let mut slot = self.session.lock().await;
        if let Some(mut session) = slot.take() {
            info!(target_db = %self.target, "Closing connection");
            session.close().await;
        }
        self.state.send_replace(ConnectionState::Uninitialized);
    }

    async fn connect_locked(&self, slot: &mut MutexGuard<'_, SessionSlot>) -> ToolResult<()> {
        if slot.is_some() {
            return Ok(());
        }

        self.state.send_replace(ConnectionState::Connecting);
        info!(
            target_db = %self.target,
            database = %self.settings.describe(),
            "Connecting to database"
        );

        let attempt = timeout(self.connect_timeout, self.connector.connect(&self.settings)).await;
        let result = match attempt {
            Ok(result) => result,
            Err(_) => Err(ToolError::connection(
                format!(
                    "Connecting to the {} database timed out after {}s",
                    self.target,
                    self.connect_timeout.as_secs()
                ),
                "Check that the database host is reachable",
            )),
        };

        match result {
            Ok(session) => {
                **slot = Some(session);
                self.state.send_replace(ConnectionState::Ready);
                info!(target_db = %self.target, "Connected successfully");
                Ok(())
            }
            Err(e) => {
                self.state.send_replace(ConnectionState::Failed);
                warn!(target_db = %self.target, error = %e, "Connection attempt failed");
                Err(e)
            }
        }
    }

    fn mark_lost(&self) {
        self.state.send_replace(ConnectionState::Failed);
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("target", &self.target)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish()
    }
}

/// Exclusive use of a Ready session.
pub struct SessionGuard<'a> {
    handle: &'a ConnectionHandle,
    slot: MutexGuard<'a, SessionSlot>,
}

impl SessionGuard<'_> {
    pub fn target(&self) -> DatabaseTarget {
        self.handle.target
    }

    pub async fn execute(&mut self, sql: &str) -> ToolResult<()> {
        match self.slot.as_mut() {
            Some(session) => session.execute(sql).await,
            None => Err(session_lost(self.handle.target)),
        }
    }

    pub async fn fetch_all(&mut self, sql: &str) -> ToolResult<Vec<JsonRow>> {
        match self.slot.as_mut() {
            Some(session) => session.fetch_all(sql).await,
            None => Err(session_lost(self.handle.target)),
        }
    }

    /// Drop the session; the next use of the handle reconnects.
    pub async fn discard(&mut self) {
        if let Some(mut session) = self.slot.take() {
            warn!(target_db = %self.handle.target, "Discarding database session");
            session.close().await;
        }
        self.handle.mark_lost();
    }
}

fn session_lost(target: DatabaseTarget) -> ToolError {
    ToolError::connection(
        format!("The {} database session was discarded", target),
        "Call the tool again to reconnect",
    )
}

/// Owner of the two process-wide connection handles.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    reporting: Arc<ConnectionHandle>,
    general: Arc<ConnectionHandle>,
}

impl ConnectionManager {
    /// Create a manager; no connection is opened until first use.
    pub fn new(settings: DatabaseSettings, connector: Arc<dyn Connector>) -> Self {
        let handle = |target: DatabaseTarget| {
            Arc::new(ConnectionHandle::new(
                target,
                settings.for_target(target).clone(),
                connector.clone(),
                settings.connect_timeout,
            ))
        };
        Self {
            reporting: handle(DatabaseTarget::Reporting),
            general: handle(DatabaseTarget::General),
        }
    }

    pub fn handle(&self, target: DatabaseTarget) -> &ConnectionHandle {
        match target {
            DatabaseTarget::Reporting => &self.reporting,
            DatabaseTarget::General => &self.general,
        }
    }

    pub async fn ensure_ready(&self, target: DatabaseTarget) -> ToolResult<()> {
        self.handle(target).ensure_ready().await
    }

    pub fn state(&self, target: DatabaseTarget) -> ConnectionState {
        self.handle(target).state()
    }

    /// Close all open sessions.
    pub async fn close_all(&self) {
        for target in DatabaseTarget::ALL {
            self.handle(target).close().await;
        }
        debug!("All connections closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullSession;

    #[async_trait]
    impl SqlSession for NullSession {
        async fn execute(&mut self, _sql: &str) -> ToolResult<()> {
            Ok(())
        }

        async fn fetch_all(&mut self, _sql: &str) -> ToolResult<Vec<JsonRow>> {
            Ok(Vec::new())
        }

        async fn close(&mut self) {}
    }

    /// Connector that fails the first `failures` attempts.
    struct CountingConnector {
        attempts: AtomicUsize,
        failures: usize,
        delay: Duration,
    }

    impl CountingConnector {
        fn new(failures: usize, delay: Duration) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                failures,
                delay,
            }
        }
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn connect(&self, _settings: &TargetSettings) -> ToolResult<Box<dyn SqlSession>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if attempt < self.failures {
                Err(ToolError::connection("connection refused", "retry"))
            } else {
                Ok(Box::new(NullSession))
            }
        }
    }

    fn settings() -> TargetSettings {
        TargetSettings {
            host: "localhost".to_string(),
            port: 5432,
            user: "agent".to_string(),
            password: "secret".to_string(),
            database: "reporting".to_string(),
        }
    }

    fn handle_with(connector: Arc<CountingConnector>) -> ConnectionHandle {
        ConnectionHandle::new(
            DatabaseTarget::Reporting,
            settings(),
            connector,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_starts_uninitialized() {
        let connector = Arc::new(CountingConnector::new(0, Duration::ZERO));
        let handle = handle_with(connector.clone());
        assert_eq!(handle.state(), ConnectionState::Uninitialized);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_ready_is_idempotent() {
        let connector = Arc::new(CountingConnector::new(0, Duration::ZERO));
        let handle = handle_with(connector.clone());
        for _ in 0..5 {
            handle.ensure_ready().await.unwrap();
            assert!(handle.state().is_ready());
        }
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_connect_once() {
        let connector = Arc::new(CountingConnector::new(0, Duration::from_millis(20)));
        let handle = Arc::new(handle_with(connector.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.ensure_ready().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn test_failed_connect_is_retried_on_next_call() {
        let connector = Arc::new(CountingConnector::new(1, Duration::ZERO));
        let handle = handle_with(connector.clone());

        let err = handle.ensure_ready().await.unwrap_err();
        assert_eq!(err.kind(), "connection");
        assert_eq!(handle.state(), ConnectionState::Failed);

        handle.ensure_ready().await.unwrap();
        assert_eq!(handle.state(), ConnectionState::Ready);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_marks_failed() {
        let connector = Arc::new(CountingConnector::new(0, Duration::from_secs(60)));
        let handle = ConnectionHandle::new(
            DatabaseTarget::General,
            settings(),
            connector,
            Duration::from_secs(1),
        );
        let err = handle.ensure_ready().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(handle.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_discard_forces_reconnect() {
        let connector = Arc::new(CountingConnector::new(0, Duration::ZERO));
        let handle = handle_with(connector.clone());
        {
            let mut guard = handle.acquire().await.unwrap();
            guard.discard().await;
            assert!(guard.execute("SELECT 1").await.is_err());
        }
        assert_eq!(handle.state(), ConnectionState::Failed);

        handle.ensure_ready().await.unwrap();
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_close_returns_to_uninitialized() {
        let connector = Arc::new(CountingConnector::new(0, Duration::ZERO));
        let handle = handle_with(connector);
        handle.ensure_ready().await.unwrap();
        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Uninitialized);
    }
}
