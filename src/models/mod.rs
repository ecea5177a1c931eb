//! Data models for the ops MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod cloud;
pub mod connection;
pub mod query;

// Re-export commonly used types
pub use cloud::CloudInvocation;
pub use connection::{ConnectionState, DatabaseTarget, TargetSettings};
pub use query::{JsonRow, QueryMode, QueryRequest, QueryResult};
