//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: Execute any SQL statement
//! - `list_tables`: List tables and views of a schema with row counts
//! - `describe_table`: Columns, constraints and storage of one table
//! - `list_relationships`: Foreign-key graph of a schema with join suggestions
//! - `query_hints`: Canned example queries for the active backend
//! - `test_connection`: Connectivity check with basic server information
//!
//! Handlers are generic over [`ConnectionSource`](crate::db::ConnectionSource) and
//! return a [`ToolReport`]: either the tool's output or a structured error payload.

pub mod diagnostics;
pub mod query;
pub mod schema;

use crate::error::ErrorReport;
use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

pub use diagnostics::{ConnectionStatus, DiagnosticsToolHandler, QueryHintsOutput};
pub use query::{QueryInput, QueryToolHandler};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListTablesOutput, RelationshipsOutput, SchemaInput,
    SchemaToolHandler,
};

/// Result of one tool call that reached the database layer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolReport<T> {
    Success(T),
    /// `{error, ...context}`, returned instead of a protocol fault
    Failed(ErrorReport),
}

impl<T> ToolReport<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(self) -> Option<ErrorReport> {
        match self {
            Self::Success(_) => None,
            Self::Failed(report) => Some(report),
        }
    }
}

impl<T: Serialize> ToolReport<T> {
    /// Render as a tool result with a JSON body. Failures set `is_error`.
    pub fn into_call_result(self) -> Result<CallToolResult, McpError> {
        match self {
            Self::Success(value) => Ok(CallToolResult::success(vec![Content::json(value)?])),
            Self::Failed(report) => Ok(CallToolResult::error(vec![Content::json(report)?])),
        }
    }
}
