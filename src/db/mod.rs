//! Database access layer.
//!
//! - `connection`: lazy per-target sessions and their lifecycle
//! - `executor`: the BEGIN/COMMIT/ROLLBACK envelope around one statement
//! - `postgres`: the sqlx-backed PostgreSQL session
//! - `types`: PostgreSQL column values as JSON

pub mod connection;
pub mod executor;
pub mod postgres;
pub mod types;

pub use connection::{ConnectionHandle, ConnectionManager, Connector, SessionGuard, SqlSession};
pub use executor::QueryExecutor;
pub use postgres::{PgConnector, PgSession};
