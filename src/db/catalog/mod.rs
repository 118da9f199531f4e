//! Catalog introspection.
//!
//! # Architecture
//!
//! A [`CatalogDialect`] supplies only SQL text and classification rules for one
//! backend's system catalog. [`CatalogReader`] runs those statements through a
//! [`SqlConnection`], normalizes the rows, and reconciles them into the shared
//! schema models. Every dialect aliases its result columns to the same names, so
//! the reader never branches on the backend.

mod postgres;
mod vertica;

pub use postgres::PostgresDialect;
pub use vertica::VerticaDialect;

use crate::db::connection::SqlConnection;
use crate::db::normalizer::execute_normalized;
use crate::error::{DbError, DbResult};
use crate::models::{
    Backend, ColumnDescriptor, ConstraintDescriptor, ConstraintKind, ObjectKind,
    ProjectionDescriptor, QueryParam, Record, RelationshipEdge, RowCount, TableSummary,
};
use serde::Serialize;
use tracing::{debug, warn};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStatement {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl CatalogStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// A canned example query shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct QueryHint {
    pub title: String,
    pub description: String,
    pub sql: String,
}

impl QueryHint {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            sql: sql.into(),
        }
    }
}

/// Backend-specific catalog knowledge.
///
/// Result column aliases every implementation must produce:
/// - tables: `table_name`, `table_type`, then any extra metadata columns
/// - columns: `column_name`, `data_type`, `is_nullable`, `column_default`,
///   `character_maximum_length`, `numeric_precision`, `numeric_scale`
/// - constraints: `constraint_name`, `constraint_type`, `column_name`,
///   `foreign_table_name`, `foreign_column_name`
/// - foreign keys: `source_table`, `source_column`, `target_table`,
///   `target_column`, `constraint_name`
/// - projections: `projection_name`, `is_super_projection`, `is_segmented`,
///   `is_up_to_date`
/// - storage: `storage_bytes`; row counts: `row_count`; table count: `table_count`
/// - connection info: `username`, `database_name`, `version`
pub trait CatalogDialect: Send + Sync {
    fn backend(&self) -> Backend;

    /// Tables and views of a schema, ordered by name.
    fn tables_query(&self, schema: &str) -> CatalogStatement;

    /// Columns of one table or view, ordered by ordinal position.
    fn columns_query(&self, schema: &str, table: &str) -> CatalogStatement;

    fn constraints_query(&self, schema: &str, table: &str) -> CatalogStatement;

    /// Foreign-key edges of a whole schema, ordered by source table then column.
    fn foreign_keys_query(&self, schema: &str) -> CatalogStatement;

    /// Whether tables have physical projections worth reporting.
    fn supports_projections(&self) -> bool {
        false
    }

    /// Physical projections of a table. `None` when the backend has no such concept.
    fn projections_query(&self, _schema: &str, _table: &str) -> Option<CatalogStatement> {
        None
    }

    /// Total on-disk size of a table in bytes.
    fn storage_query(&self, schema: &str, table: &str) -> Option<CatalogStatement>;

    fn connection_info_query(&self) -> CatalogStatement;

    fn table_count_query(&self, schema: &str) -> CatalogStatement;

    /// Exact row count of one table.
    fn row_count_query(&self, schema: &str, table: &str) -> CatalogStatement {
        CatalogStatement::new(format!(
            "SELECT COUNT(*) AS row_count FROM {}",
            qualified_name(schema, table)
        ))
    }

    /// Map the raw catalog object type onto the shared kinds.
    fn classify_object(&self, raw: &str) -> ObjectKind;

    /// Map the raw catalog constraint type onto the shared kinds.
    fn classify_constraint(&self, raw: &str) -> ConstraintKind;

    /// Example shown when a client sends an empty query.
    fn example_query(&self) -> &'static str;

    fn query_hints(&self, schema: &str) -> Vec<QueryHint>;
}

impl Backend {
    /// Catalog dialect matching this backend.
    pub fn dialect(&self) -> &'static dyn CatalogDialect {
        match self {
            Backend::Postgres => &PostgresDialect,
            Backend::Vertica => &VerticaDialect,
        }
    }
}

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `"schema"."table"` with both parts quoted.
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Map an object-type string the way both catalogs spell it.
pub(crate) fn classify_object_type(raw: &str, table_spelling: &str) -> ObjectKind {
    let upper = raw.trim().to_uppercase();
    if upper == table_spelling {
        ObjectKind::Table
    } else if upper == "VIEW" {
        ObjectKind::View
    } else {
        ObjectKind::Other(raw.trim().to_lowercase())
    }
}

/// Reads one schema's catalog through a borrowed connection.
pub struct CatalogReader<'c, C> {
    conn: &'c mut C,
    dialect: &'c dyn CatalogDialect,
}

impl<'c, C: SqlConnection> CatalogReader<'c, C> {
    pub fn new(conn: &'c mut C, dialect: &'c dyn CatalogDialect) -> Self {
        Self { conn, dialect }
    }

    pub fn dialect(&self) -> &dyn CatalogDialect {
        self.dialect
    }

    async fn fetch(&mut self, statement: &CatalogStatement) -> DbResult<Vec<Record>> {
        let normalized = execute_normalized(&mut *self.conn, &statement.sql, &statement.params).await?;
        Ok(normalized.records)
    }

    /// List tables and views with row counts.
    ///
    /// Only tables are counted. A failed count leaves that table at "N/A" and the
    /// listing goes on.
    pub async fn list_tables(&mut self, schema: &str) -> DbResult<Vec<TableSummary>> {
        let statement = self.dialect.tables_query(schema);
        let records = self
            .fetch(&statement)
            .await
            .map_err(|e| DbError::catalog_query(&e, schema, None))?;

        let mut tables = Vec::with_capacity(records.len());
        for mut record in records {
            let table_name = take_text(&mut record, "table_name").unwrap_or_default();
            let raw_type = take_text(&mut record, "table_type").unwrap_or_default();
            let kind = self.dialect.classify_object(&raw_type);

            let row_count = if kind.is_table() {
                RowCount::from(self.probe_row_count(schema, &table_name).await)
            } else {
                RowCount::NotApplicable
            };

            let mut summary = TableSummary::new(table_name, kind).with_row_count(row_count);
            summary.extra = record.into_map();
            tables.push(summary);
        }

        debug!(schema = %schema, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Columns of a table. Empty when the table does not exist.
    pub async fn list_columns(
        &mut self,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let statement = self.dialect.columns_query(schema, table);
        let records = self
            .fetch(&statement)
            .await
            .map_err(|e| DbError::catalog_query(&e, schema, Some(table)))?;

        Ok(records
            .iter()
            .map(|record| {
                let mut column = ColumnDescriptor::new(
                    record.text("column_name").unwrap_or_default(),
                    record.text("data_type").unwrap_or_default(),
                    record.flag("is_nullable").unwrap_or(true),
                )
                .with_numeric(
                    record.unsigned("numeric_precision"),
                    record.unsigned("numeric_scale"),
                );
                if let Some(default) = record.text("column_default") {
                    column = column.with_default(default);
                }
                if let Some(length) = record.unsigned("character_maximum_length") {
                    column = column.with_character_length(length);
                }
                column
            })
            .collect())
    }

    pub async fn list_constraints(
        &mut self,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ConstraintDescriptor>> {
        let statement = self.dialect.constraints_query(schema, table);
        let records = self
            .fetch(&statement)
            .await
            .map_err(|e| DbError::catalog_query(&e, schema, Some(table)))?;

        Ok(records
            .iter()
            .map(|record| {
                let kind = self
                    .dialect
                    .classify_constraint(record.text("constraint_type").unwrap_or_default());
                ConstraintDescriptor::new(
                    record.text("constraint_name").unwrap_or_default(),
                    kind,
                    record.text("column_name").map(String::from),
                )
                .with_target(
                    record.text("foreign_table_name").map(String::from),
                    record.text("foreign_column_name").map(String::from),
                )
            })
            .collect())
    }

    /// Foreign-key edges of the whole schema.
    pub async fn list_foreign_keys(&mut self, schema: &str) -> DbResult<Vec<RelationshipEdge>> {
        let statement = self.dialect.foreign_keys_query(schema);
        let records = self
            .fetch(&statement)
            .await
            .map_err(|e| DbError::catalog_query(&e, schema, None))?;

        Ok(records
            .iter()
            .map(|record| {
                RelationshipEdge::new(
                    record.text("source_table").unwrap_or_default(),
                    record.text("source_column").unwrap_or_default(),
                    record.text("target_table").unwrap_or_default(),
                    record.text("target_column").unwrap_or_default(),
                    record.text("constraint_name").unwrap_or_default(),
                )
            })
            .collect())
    }

    /// Projections of a table; always empty on backends without projections.
    pub async fn list_projections(
        &mut self,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ProjectionDescriptor>> {
        let Some(statement) = self.dialect.projections_query(schema, table) else {
            return Ok(Vec::new());
        };
        let records = self
            .fetch(&statement)
            .await
            .map_err(|e| DbError::catalog_query(&e, schema, Some(table)))?;

        Ok(records
            .iter()
            .map(|record| ProjectionDescriptor {
                projection_name: record.text("projection_name").unwrap_or_default().to_string(),
                is_super_projection: record.flag("is_super_projection"),
                is_segmented: record.flag("is_segmented"),
                is_up_to_date: record.flag("is_up_to_date"),
            })
            .collect())
    }

    /// Exact row count, or `None` if counting failed for any reason.
    pub async fn probe_row_count(&mut self, schema: &str, table: &str) -> Option<u64> {
        let statement = self.dialect.row_count_query(schema, table);
        self.probe(&statement, "row_count", schema, table).await
    }

    /// Storage size in bytes, or `None` if unavailable.
    pub async fn probe_storage_bytes(&mut self, schema: &str, table: &str) -> Option<u64> {
        let statement = self.dialect.storage_query(schema, table)?;
        self.probe(&statement, "storage_bytes", schema, table).await
    }

    async fn probe(
        &mut self,
        statement: &CatalogStatement,
        column: &str,
        schema: &str,
        table: &str,
    ) -> Option<u64> {
        match self.fetch(statement).await {
            Ok(records) => records.first().and_then(|record| record.unsigned(column)),
            Err(e) => {
                warn!(
                    schema = %schema,
                    table = %table,
                    probe = %column,
                    error = %e,
                    "Catalog probe failed"
                );
                None
            }
        }
    }

    /// Current user, database and server version as one record.
    pub async fn connection_info(&mut self) -> DbResult<Record> {
        let statement = self.dialect.connection_info_query();
        let records = self.fetch(&statement).await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| DbError::internal("Connection info query returned no rows"))
    }

    /// Number of tables and views in a schema.
    pub async fn table_count(&mut self, schema: &str) -> DbResult<u64> {
        let statement = self.dialect.table_count_query(schema);
        let records = self
            .fetch(&statement)
            .await
            .map_err(|e| DbError::catalog_query(&e, schema, None))?;
        Ok(records
            .first()
            .and_then(|record| record.unsigned("table_count"))
            .unwrap_or(0))
    }
}

fn take_text(record: &mut Record, key: &str) -> Option<String> {
    match record.take(key)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
