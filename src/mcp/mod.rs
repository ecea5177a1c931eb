//! MCP server integration module.
//!
//! Bridges the MCP protocol (rmcp) and the tool registry.

pub mod service;

pub use service::OpsService;
