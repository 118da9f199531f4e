//! Vertica sessions over the simple-query protocol.
//!
//! Vertica accepts the PostgreSQL v3 frontend protocol but not PostgreSQL's type
//! system: its type OIDs collide with PostgreSQL's (NUMERIC is OID 16, PostgreSQL's
//! `bool`) and there is no `pg_type` catalog to resolve them. The simple-query flow
//! never asks the server to describe or bind types, so:
//!
//! - every value arrives as text and is reported as a JSON string, NULL as `null`
//! - positional `?` parameters are rendered as SQL literals before sending
//!
//! One session is opened per acquisition and closed when dropped. A semaphore
//! bounds concurrent sessions to the configured `max_connections`.

use crate::db::catalog::quote_literal;
use crate::db::connection::{ConnectionSource, SqlConnection};
use crate::db::pool::connection_suggestion;
use crate::error::{DbError, DbResult};
use crate::models::{Backend, ConnectionSettings, QueryOutcome, QueryParam};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_postgres::config::SslMode;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage, SimpleQueryRow};
use tracing::{debug, info, warn};

const AUTOCOMMIT_ON: &str = "SET SESSION AUTOCOMMIT TO ON";

/// Session-per-operation connection provider for Vertica.
#[derive(Debug, Clone)]
pub struct VerticaConnectionProvider {
    config: tokio_postgres::Config,
    settings: ConnectionSettings,
    permits: Arc<Semaphore>,
    acquire_timeout: Duration,
    query_timeout: Duration,
}

impl VerticaConnectionProvider {
    /// Validate the settings without opening a session.
    pub fn new(settings: ConnectionSettings, query_timeout: Duration) -> DbResult<Self> {
        let url = settings.driver_url().map_err(|e| {
            DbError::connection(e, "Check the host, port, user and database settings")
        })?;
        let mut config: tokio_postgres::Config = url.parse().map_err(|e: tokio_postgres::Error| {
            DbError::connection(
                format!("Invalid connection settings: {}", e),
                connection_suggestion(settings.backend, &e),
            )
        })?;

        if config.get_ssl_mode() == SslMode::Require {
            return Err(DbError::connection(
                "TLS is not available for Vertica sessions",
                "Remove sslmode=require from the connection URL",
            ));
        }
        config.ssl_mode(SslMode::Disable);

        let pool_opts = &settings.pool_options;
        let acquire_timeout = Duration::from_secs(pool_opts.acquire_timeout_or_default());
        if config.get_connect_timeout().is_none() {
            config.connect_timeout(acquire_timeout);
        }
        let max_sessions = pool_opts.max_connections_or_default() as usize;

        info!(
            backend = %settings.backend,
            url = %settings.masked_url(),
            max_connections = max_sessions,
            "Vertica session provider configured"
        );

        Ok(Self {
            config,
            settings,
            permits: Arc::new(Semaphore::new(max_sessions)),
            acquire_timeout,
            query_timeout,
        })
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    async fn open_session(&self) -> DbResult<VerticaSession> {
        let permit = self.permits.clone().acquire_owned().await.map_err(|_| {
            DbError::connection("Connection pool is closed", "Restart the server")
        })?;

        let (client, connection) = self.config.connect(NoTls).await.map_err(|e| {
            DbError::connection(
                format!("Failed to acquire connection: {}", e),
                connection_suggestion(self.settings.backend, &e),
            )
        })?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "Vertica session ended with an error");
            }
        });

        // Sessions start with autocommit off; DML would roll back on drop
        client.batch_execute(AUTOCOMMIT_ON).await?;

        Ok(VerticaSession {
            client,
            query_timeout: self.query_timeout,
            _permit: permit,
        })
    }
}

impl ConnectionSource for VerticaConnectionProvider {
    type Connection = VerticaSession;

    fn backend(&self) -> Backend {
        self.settings.backend
    }

    fn masked_url(&self) -> String {
        self.settings.masked_url()
    }

    async fn acquire(&self) -> DbResult<VerticaSession> {
        tokio::time::timeout(self.acquire_timeout, self.open_session())
            .await
            .map_err(|_| {
                DbError::connection(
                    "Timed out opening a Vertica session",
                    "Raise --acquire-timeout or --max-connections, or check that the server is reachable",
                )
            })?
    }

    async fn close(&self) {
        info!(backend = %self.settings.backend, "Closing Vertica sessions");
        self.permits.close();
    }
}

/// One open Vertica session, closed when dropped.
pub struct VerticaSession {
    client: Client,
    query_timeout: Duration,
    _permit: OwnedSemaphorePermit,
}

impl SqlConnection for VerticaSession {
    async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        let statement = inline_params(sql, params)?;
        debug!(sql = %sql, params = params.len(), "Executing statement");

        let limit = self.query_timeout;
        let messages = tokio::time::timeout(limit, self.client.simple_query(&statement))
            .await
            .map_err(|_| DbError::timeout("statement execution", limit.as_secs()))??;

        Ok(fold_frames(messages.iter().filter_map(Frame::from_message)))
    }
}

/// The parts of a simple-query response that shape the outcome.
#[derive(Debug, Clone, PartialEq)]
enum Frame {
    Columns(Vec<String>),
    Row {
        columns: Vec<String>,
        values: Vec<JsonValue>,
    },
    Complete(u64),
}

impl Frame {
    fn from_message(message: &SimpleQueryMessage) -> Option<Self> {
        match message {
            SimpleQueryMessage::RowDescription(columns) => Some(Frame::Columns(
                columns.iter().map(|c| c.name().to_string()).collect(),
            )),
            SimpleQueryMessage::Row(row) => Some(Frame::Row {
                columns: row.columns().iter().map(|c| c.name().to_string()).collect(),
                values: text_values(row),
            }),
            SimpleQueryMessage::CommandComplete(count) => Some(Frame::Complete(*count)),
            _ => None,
        }
    }
}

fn text_values(row: &SimpleQueryRow) -> Vec<JsonValue> {
    (0..row.len())
        .map(|idx| match row.try_get(idx) {
            Ok(Some(text)) => JsonValue::String(text.to_string()),
            _ => JsonValue::Null,
        })
        .collect()
}

/// Build the outcome of the first statement in a response.
///
/// A row description marks a row set even when no rows follow; a completion
/// without one is a statement effect.
fn fold_frames(frames: impl IntoIterator<Item = Frame>) -> QueryOutcome {
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for frame in frames {
        match frame {
            Frame::Columns(names) => {
                columns.get_or_insert(names);
            }
            Frame::Row {
                columns: names,
                values,
            } => {
                columns.get_or_insert(names);
                rows.push(values);
            }
            Frame::Complete(count) => {
                return match columns {
                    Some(columns) => QueryOutcome::Projection { columns, rows },
                    None => QueryOutcome::effect(count),
                };
            }
        }
    }

    match columns {
        Some(columns) => QueryOutcome::Projection { columns, rows },
        None => QueryOutcome::Effect {
            rows_affected: None,
        },
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Scan {
    Code,
    Literal,
    Identifier,
    LineComment,
    BlockComment,
}

/// Replace each `?` placeholder with its parameter rendered as a SQL literal.
///
/// Placeholders inside string literals, quoted identifiers and comments are left
/// alone. A statement with no parameters is sent untouched.
pub fn inline_params(sql: &str, params: &[QueryParam]) -> DbResult<String> {
    if params.is_empty() {
        return Ok(sql.to_string());
    }

    let mut rendered = String::with_capacity(sql.len() + params.len() * 8);
    let mut remaining = params.iter();
    let mut chars = sql.chars().peekable();
    let mut state = Scan::Code;

    while let Some(c) = chars.next() {
        match state {
            Scan::Code => match c {
                '\'' => state = Scan::Literal,
                '"' => state = Scan::Identifier,
                '-' if chars.peek() == Some(&'-') => state = Scan::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    rendered.push(c);
                    rendered.extend(chars.next());
                    state = Scan::BlockComment;
                    continue;
                }
                '?' => {
                    let param = remaining.next().ok_or_else(|| {
                        DbError::invalid_input(format!(
                            "Statement has more placeholders than the {} parameters given",
                            params.len()
                        ))
                    })?;
                    rendered.push_str(&param_literal(param));
                    continue;
                }
                _ => {}
            },
            Scan::Literal if c == '\'' => state = Scan::Code,
            Scan::Identifier if c == '"' => state = Scan::Code,
            Scan::LineComment if c == '\n' => state = Scan::Code,
            Scan::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                rendered.push(c);
                rendered.extend(chars.next());
                state = Scan::Code;
                continue;
            }
            _ => {}
        }
        rendered.push(c);
    }

    if remaining.next().is_some() {
        return Err(DbError::invalid_input(format!(
            "Statement has fewer placeholders than the {} parameters given",
            params.len()
        )));
    }
    Ok(rendered)
}

/// Negative numbers are parenthesized so `x -?` never becomes a comment.
fn param_literal(param: &QueryParam) -> String {
    match param {
        QueryParam::Null => "NULL".to_string(),
        QueryParam::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        QueryParam::Int(v) if *v < 0 => format!("({})", v),
        QueryParam::Int(v) => v.to_string(),
        QueryParam::Float(v) if v.is_nan() => "'NaN'::FLOAT".to_string(),
        QueryParam::Float(v) if v.is_infinite() => {
            let text = if *v > 0.0 { "Infinity" } else { "-Infinity" };
            format!("{}::FLOAT", quote_literal(text))
        }
        QueryParam::Float(v) if v.is_sign_negative() => format!("({})", v),
        QueryParam::Float(v) => v.to_string(),
        QueryParam::String(v) => quote_literal(v),
    }
}
