//! Query execution tool.
//!
//! This module implements the `query` MCP tool. Any statement the backend accepts
//! is executed as-is; row sets come back as records, everything else as a single
//! `{affected_rows, operation}` record.

use crate::db::{ConnectionSource, execute_normalized};
use crate::error::{DbResult, ErrorReport};
use crate::models::Record;
use crate::tools::ToolReport;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const MISSING_SQL_MESSAGE: &str =
    "SQL query is required. Please provide a valid SQL statement.";

/// Input for the query tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute. SELECT returns rows; INSERT/UPDATE/DELETE/DDL return the affected row count.
    #[serde(default)]
    pub sql: Option<String>,
}

impl QueryInput {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
        }
    }
}

/// Handler for the query tool.
pub struct QueryToolHandler<S> {
    source: Arc<S>,
}

impl<S: ConnectionSource> QueryToolHandler<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Execute one statement.
    ///
    /// Blank SQL is rejected before a connection is acquired. Failing to acquire a
    /// connection is the only error returned; execution failures become a
    /// `{error, sql}` report.
    pub async fn query(&self, input: QueryInput) -> DbResult<ToolReport<Vec<Record>>> {
        let Some(sql) = input.sql.filter(|sql| !sql.trim().is_empty()) else {
            warn!("Query tool called without SQL");
            let example = self.source.backend().dialect().example_query();
            return Ok(ToolReport::Failed(
                ErrorReport::new(MISSING_SQL_MESSAGE).with_example(example),
            ));
        };

        info!(sql = %sql, "Received SQL query request");
        let mut conn = self.source.acquire().await?;

        match execute_normalized(&mut conn, &sql, &[]).await {
            Ok(normalized) => match normalized.rows_affected {
                Some(affected_rows) => {
                    info!(affected_rows, "Query executed successfully");
                    Ok(ToolReport::Success(vec![Record::from_pairs([
                        ("affected_rows", json!(affected_rows)),
                        ("operation", json!("completed")),
                    ])]))
                }
                None => {
                    info!(rows = normalized.records.len(), "Query executed successfully");
                    Ok(ToolReport::Success(normalized.records))
                }
            },
            Err(e) => {
                let message = format!("SQL execution failed: {}", e);
                error!(error = %e, sql = %sql, "SQL execution failed");
                Ok(ToolReport::Failed(ErrorReport::new(message).with_sql(sql)))
            }
        }
    }
}
