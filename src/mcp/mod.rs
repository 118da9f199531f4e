//! MCP server integration module.
//!
//! This module wires the tool handlers into an rmcp `ServerHandler`.

pub mod service;

pub use service::DbService;
