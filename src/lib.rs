//! Ops MCP Server Library
//!
//! MCP (Model Context Protocol) tools that let AI agents call AWS SDK
//! operations by name and run SQL against two PostgreSQL databases inside
//! explicit transaction envelopes.

pub mod auth;
pub mod cloud;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{ToolError, ToolResult};
pub use mcp::OpsService;
