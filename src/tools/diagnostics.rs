//! Diagnostic tools: `test_connection` and `query_hints`.

use crate::db::catalog::{CatalogReader, QueryHint};
use crate::db::ConnectionSource;
use crate::error::DbResult;
use crate::models::Record;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Server versions longer than this are cut and suffixed with `...`.
pub const VERSION_DISPLAY_LIMIT: usize = 100;

/// Output of the test_connection tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected {
        user: String,
        database: String,
        version: String,
        /// Tables and views in the default schema
        table_count: u64,
        connection_url: String,
    },
    Failed {
        error: String,
        connection_url: String,
    },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Output of the query_hints tool.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHintsOutput {
    pub backend: String,
    pub schema: String,
    pub hints: Vec<QueryHint>,
}

/// Handler for diagnostic tools.
pub struct DiagnosticsToolHandler<S> {
    source: Arc<S>,
    default_schema: String,
}

impl<S: ConnectionSource> DiagnosticsToolHandler<S> {
    pub fn new(source: Arc<S>, default_schema: impl Into<String>) -> Self {
        Self {
            source,
            default_schema: default_schema.into(),
        }
    }

    /// Check connectivity and report who and where we are connected as.
    ///
    /// Never fails: an unreachable database is reported as `status: failed`.
    pub async fn test_connection(&self) -> ConnectionStatus {
        let connection_url = self.source.masked_url();
        info!(url = %connection_url, "Testing database connection");

        match self.connection_details().await {
            Ok((info, table_count)) => {
                info!(url = %connection_url, "Database connection test successful");
                ConnectionStatus::Connected {
                    user: text_of(&info, "username"),
                    database: text_of(&info, "database_name"),
                    version: truncate_version(&text_of(&info, "version")),
                    table_count,
                    connection_url,
                }
            }
            Err(e) => {
                error!(url = %connection_url, error = %e, "Database connection test failed");
                ConnectionStatus::Failed {
                    error: e.to_string(),
                    connection_url,
                }
            }
        }
    }

    async fn connection_details(&self) -> DbResult<(Record, u64)> {
        let mut conn = self.source.acquire().await?;
        let mut reader = CatalogReader::new(&mut conn, self.source.backend().dialect());
        let info = reader.connection_info().await?;
        let table_count = reader.table_count(&self.default_schema).await?;
        Ok((info, table_count))
    }

    /// Canned example queries for the active backend. Needs no connection.
    pub fn query_hints(&self, schema: Option<&str>) -> QueryHintsOutput {
        let backend = self.source.backend();
        let schema = schema
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_schema.as_str())
            .to_string();
        QueryHintsOutput {
            backend: backend.display_name().to_string(),
            hints: backend.dialect().query_hints(&schema),
            schema,
        }
    }
}

fn text_of(record: &Record, key: &str) -> String {
    match record.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Cut a version banner to [`VERSION_DISPLAY_LIMIT`] characters.
pub fn truncate_version(version: &str) -> String {
    if version.chars().count() > VERSION_DISPLAY_LIMIT {
        let head: String = version.chars().take(VERSION_DISPLAY_LIMIT).collect();
        format!("{}...", head)
    } else {
        version.to_string()
    }
}
