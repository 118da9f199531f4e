//! Scripted in-memory connection source shared by the integration tests.
//!
//! Each rule pairs a SQL substring with a canned response; the first rule whose
//! pattern occurs in the executed SQL wins. Unmatched SQL fails loudly.

#![allow(dead_code)]

use catalog_mcp_server::db::{ConnectionSource, SqlConnection};
use catalog_mcp_server::error::{DbError, DbResult};
use catalog_mcp_server::models::{Backend, QueryOutcome, QueryParam};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum Response {
    Outcome(QueryOutcome),
    Fail(String),
}

#[derive(Debug, Default)]
pub struct Script {
    rules: Vec<(String, Response)>,
    executed: Mutex<Vec<(String, Vec<QueryParam>)>>,
}

impl Script {
    fn respond(&self, sql: &str, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push((sql.to_string(), params.to_vec()));
        }
        match self.rules.iter().find(|(pattern, _)| sql.contains(pattern.as_str())) {
            Some((_, Response::Outcome(outcome))) => Ok(outcome.clone()),
            Some((_, Response::Fail(message))) => {
                Err(DbError::database(message.clone(), None, "scripted failure"))
            }
            None => Err(DbError::database(
                format!("no scripted response for: {}", sql.trim()),
                None,
                "add a rule",
            )),
        }
    }
}

pub struct ScriptedConnection {
    script: Arc<Script>,
}

impl SqlConnection for ScriptedConnection {
    async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        self.script.respond(sql, params)
    }
}

pub struct ScriptedSource {
    backend: Backend,
    script: Arc<Script>,
    acquisitions: AtomicUsize,
    refuse_connections: bool,
    closed: AtomicBool,
}

impl ScriptedSource {
    pub fn builder(backend: Backend) -> ScriptBuilder {
        ScriptBuilder {
            backend,
            rules: Vec::new(),
            refuse_connections: false,
        }
    }

    /// How many connections were handed out.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Every statement executed so far, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.script
            .executed
            .lock()
            .map(|executed| executed.iter().map(|(sql, _)| sql.clone()).collect())
            .unwrap_or_default()
    }

    pub fn executed_params(&self) -> Vec<Vec<QueryParam>> {
        self.script
            .executed
            .lock()
            .map(|executed| executed.iter().map(|(_, params)| params.clone()).collect())
            .unwrap_or_default()
    }

    pub fn was_executed(&self, pattern: &str) -> bool {
        self.executed_sql().iter().any(|sql| sql.contains(pattern))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ConnectionSource for ScriptedSource {
    type Connection = ScriptedConnection;

    fn backend(&self) -> Backend {
        self.backend
    }

    fn masked_url(&self) -> String {
        format!("{}://tester:***@scripted:{}/testdb", self.backend.scheme(), self.backend.default_port())
    }

    async fn acquire(&self) -> DbResult<ScriptedConnection> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connections || self.is_closed() {
            return Err(DbError::connection(
                "Failed to acquire connection: connection refused",
                "Check that the server is running",
            ));
        }
        Ok(ScriptedConnection {
            script: self.script.clone(),
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct ScriptBuilder {
    backend: Backend,
    rules: Vec<(String, Response)>,
    refuse_connections: bool,
}

impl ScriptBuilder {
    /// Answer SQL containing `pattern` with positional rows.
    pub fn rows(mut self, pattern: &str, columns: &[&str], rows: Vec<Vec<JsonValue>>) -> Self {
        self.rules.push((
            pattern.to_string(),
            Response::Outcome(QueryOutcome::projection(columns.iter().copied(), rows)),
        ));
        self
    }

    /// Answer SQL containing `pattern` with an affected-row count.
    pub fn effect(mut self, pattern: &str, rows_affected: u64) -> Self {
        self.rules.push((
            pattern.to_string(),
            Response::Outcome(QueryOutcome::effect(rows_affected)),
        ));
        self
    }

    /// Fail SQL containing `pattern` with a backend error message.
    pub fn fail(mut self, pattern: &str, message: &str) -> Self {
        self.rules
            .push((pattern.to_string(), Response::Fail(message.to_string())));
        self
    }

    /// Every acquisition fails as if the server were down.
    pub fn refuse_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    pub fn build(self) -> Arc<ScriptedSource> {
        Arc::new(ScriptedSource {
            backend: self.backend,
            script: Arc::new(Script {
                rules: self.rules,
                executed: Mutex::new(Vec::new()),
            }),
            acquisitions: AtomicUsize::new(0),
            refuse_connections: self.refuse_connections,
            closed: AtomicBool::new(false),
        })
    }
}

/// Patterns matching the PostgreSQL dialect's catalog statements.
pub mod pg {
    pub const TABLES: &str = "information_schema.tables t";
    pub const COLUMNS: &str = "information_schema.columns c";
    pub const CONSTRAINTS: &str = "AS foreign_table_name";
    pub const FOREIGN_KEYS: &str = "AS source_table";
    pub const STORAGE: &str = "pg_total_relation_size";
    pub const CONNECTION_INFO: &str = "current_database()";
    pub const TABLE_COUNT: &str = "AS table_count";

    /// Row-count probe for one table.
    pub fn count(schema: &str, table: &str) -> String {
        format!("COUNT(*) AS row_count FROM \"{}\".\"{}\"", schema, table)
    }
}

/// Patterns matching the Vertica dialect's catalog statements.
pub mod vertica {
    pub const TABLES: &str = "v_catalog.all_tables";
    pub const COLUMNS: &str = "v_catalog.view_columns";
    pub const CONSTRAINTS: &str = "v_catalog.constraint_columns";
    pub const FOREIGN_KEYS: &str = "v_catalog.foreign_keys";
    pub const PROJECTIONS: &str = "projection_name, is_super_projection";
    pub const STORAGE: &str = "v_monitor.projection_storage";
}
