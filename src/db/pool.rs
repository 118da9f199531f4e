//! Connection pool management.
//!
//! This module provides the sqlx-backed [`ConnectionSource`] for PostgreSQL.
//! Vertica sessions live in [`super::vertica`].

use crate::db::connection::{ConnectionSource, SqlConnection};
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{Backend, ConnectionSettings, QueryOutcome, QueryParam};
use futures_util::TryStreamExt;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, PgPool, Postgres, Statement};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Pool-backed connection provider.
#[derive(Debug, Clone)]
pub struct PgConnectionProvider {
    pool: PgPool,
    settings: ConnectionSettings,
    query_timeout: Duration,
}

impl PgConnectionProvider {
    /// Configure the pool without opening a connection yet.
    ///
    /// The first acquisition connects; call [`check_connectivity`](Self::check_connectivity)
    /// to find out early whether the database is reachable.
    pub fn connect_lazy(settings: ConnectionSettings, query_timeout: Duration) -> DbResult<Self> {
        let url = settings.driver_url().map_err(|e| {
            DbError::connection(e, "Check the host, port, user and database settings")
        })?;
        let options = PgConnectOptions::from_str(&url).map_err(|e| {
            DbError::connection(
                format!("Invalid connection settings: {}", e),
                connection_suggestion(settings.backend, &e),
            )
        })?;

        let pool_opts = &settings.pool_options;
        let pool = PgPoolOptions::new()
            .min_connections(pool_opts.min_connections_or_default())
            .max_connections(pool_opts.max_connections_or_default())
            .acquire_timeout(Duration::from_secs(pool_opts.acquire_timeout_or_default()))
            .idle_timeout(Duration::from_secs(pool_opts.idle_timeout_or_default()))
            .test_before_acquire(pool_opts.test_before_acquire_or_default())
            .connect_lazy_with(options);

        info!(
            backend = %settings.backend,
            url = %settings.masked_url(),
            max_connections = pool_opts.max_connections_or_default(),
            ping_before_use = pool_opts.test_before_acquire_or_default(),
            "Connection pool configured"
        );

        Ok(Self {
            pool,
            settings,
            query_timeout,
        })
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }
}

impl ConnectionSource for PgConnectionProvider {
    type Connection = PgSession;

    fn backend(&self) -> Backend {
        self.settings.backend
    }

    fn masked_url(&self) -> String {
        self.settings.masked_url()
    }

    async fn acquire(&self) -> DbResult<PgSession> {
        let conn = self.pool.acquire().await.map_err(|e| {
            DbError::connection(
                format!("Failed to acquire connection: {}", e),
                connection_suggestion(self.settings.backend, &e),
            )
        })?;
        Ok(PgSession {
            conn,
            query_timeout: self.query_timeout,
        })
    }

    async fn close(&self) {
        info!(backend = %self.settings.backend, "Closing connection pool");
        self.pool.close().await;
    }
}

/// One pooled connection, returned to the pool when dropped.
pub struct PgSession {
    conn: PoolConnection<Postgres>,
    query_timeout: Duration,
}

impl SqlConnection for PgSession {
    async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        debug!(sql = %sql, params = params.len(), "Executing statement");
        let limit = self.query_timeout;
        tokio::time::timeout(limit, run_statement(&mut self.conn, sql, params))
            .await
            .map_err(|_| DbError::timeout("statement execution", limit.as_secs()))?
    }
}

/// Prepare first so the column metadata decides between row set and effect,
/// even for a query that returns zero rows.
async fn run_statement(
    conn: &mut PgConnection,
    sql: &str,
    params: &[QueryParam],
) -> DbResult<QueryOutcome> {
    let statement = (&mut *conn).prepare(sql).await?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    let query = params
        .iter()
        .fold(statement.query(), |query, param| bind_param(query, param));

    if columns.is_empty() {
        let result = query.execute(&mut *conn).await?;
        return Ok(QueryOutcome::effect(result.rows_affected()));
    }

    let rows: Vec<PgRow> = query.fetch(&mut *conn).try_collect().await?;
    let rows = rows.iter().map(RowToJson::to_json_values).collect();
    Ok(QueryOutcome::Projection { columns, rows })
}

/// Bind a parameter to a PostgreSQL query.
fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &'q QueryParam,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
    }
}

/// Pick a hint from the driver's error text.
pub(crate) fn connection_suggestion(backend: Backend, error: &dyn std::fmt::Display) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            backend
        );
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the user and password settings".to_string();
    }

    if error_str.contains("does not exist") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    if error_str.contains("timed out") {
        return "The database did not accept a connection in time; check the acquire timeout"
            .to_string();
    }

    format!(
        "Verify the connection settings: {}://user:pass@host:{}/db",
        backend.scheme(),
        backend.default_port()
    )
}
