//! Catalog MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants to
//! run SQL and introspect schemas on PostgreSQL or Vertica, with both catalogs
//! reconciled into one normalized shape.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbService;
