//! Schema introspection tools.
//!
//! This module implements the `list_tables`, `describe_table` and
//! `list_relationships` MCP tools on top of the catalog reader.

use crate::db::catalog::{CatalogReader, qualified_name, quote_ident};
use crate::db::{ConnectionSource, SqlConnection};
use crate::error::{DbError, DbResult, ErrorReport};
use crate::models::{
    ColumnDescriptor, ConstraintDescriptor, ProjectionDescriptor, RelationshipEdge, RowCount,
    TableSummary,
};
use crate::tools::ToolReport;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Input for tools that operate on a whole schema.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SchemaInput {
    /// Schema name. Defaults to the server's configured schema.
    #[serde(default)]
    pub schema: Option<String>,
}

impl SchemaInput {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
        }
    }
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Name of the table to describe
    pub table_name: String,
    /// Schema containing the table. Defaults to the server's configured schema.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Format bytes as human-readable size string.
///
/// Uses binary units (1 kB = 1024 bytes) via the `humansize` WINDOWS preset.
///
/// ```
/// use catalog_mcp_server::tools::schema::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1048576), "1 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::WINDOWS)
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize)]
pub struct ListTablesOutput {
    pub schema: String,
    pub table_count: usize,
    pub tables: Vec<TableSummary>,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize)]
pub struct DescribeTableOutput {
    pub schema: String,
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub constraints: Vec<ConstraintDescriptor>,
    /// Columnar backend only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projections: Option<Vec<ProjectionDescriptor>>,
    pub row_count: RowCount,
    /// Bytes on disk, or "N/A"
    pub storage_bytes: RowCount,
    pub storage_size: String,
    pub summary: DescribeSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribeSummary {
    pub total_columns: usize,
    pub nullable_columns: usize,
    pub primary_key_columns: usize,
    /// Distinct foreign-key constraints
    pub foreign_keys: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_count: Option<usize>,
}

impl DescribeSummary {
    fn compute(
        columns: &[ColumnDescriptor],
        constraints: &[ConstraintDescriptor],
        projections: Option<&[ProjectionDescriptor]>,
    ) -> Self {
        let foreign_keys: BTreeSet<&str> = constraints
            .iter()
            .filter(|c| c.is_foreign_key())
            .map(|c| c.constraint_name.as_str())
            .collect();
        Self {
            total_columns: columns.len(),
            nullable_columns: columns.iter().filter(|c| c.nullable).count(),
            primary_key_columns: constraints.iter().filter(|c| c.is_primary_key()).count(),
            foreign_keys: foreign_keys.len(),
            projection_count: projections.map(<[ProjectionDescriptor]>::len),
        }
    }
}

/// Output from the list_relationships tool.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipsOutput {
    pub schema: String,
    pub relationships: Vec<RelationshipEdge>,
    pub join_suggestions: Vec<String>,
    pub summary: RelationshipSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipSummary {
    pub total_relationships: usize,
    /// Distinct tables appearing on either side of an edge
    pub connected_tables: usize,
}

impl RelationshipsOutput {
    pub fn new(schema: impl Into<String>, relationships: Vec<RelationshipEdge>) -> Self {
        let schema = schema.into();
        let join_suggestions = relationships
            .iter()
            .map(|edge| join_suggestion(&schema, edge))
            .collect();
        let connected: BTreeSet<&str> = relationships
            .iter()
            .flat_map(|edge| [edge.source_table.as_str(), edge.target_table.as_str()])
            .collect();
        let summary = RelationshipSummary {
            total_relationships: relationships.len(),
            connected_tables: connected.len(),
        };
        Self {
            schema,
            relationships,
            join_suggestions,
            summary,
        }
    }
}

/// Join query template for one foreign-key edge.
pub fn join_suggestion(schema: &str, edge: &RelationshipEdge) -> String {
    format!(
        "SELECT * FROM {} s JOIN {} t ON s.{} = t.{}",
        qualified_name(schema, &edge.source_table),
        qualified_name(schema, &edge.target_table),
        quote_ident(&edge.source_column),
        quote_ident(&edge.target_column),
    )
}

/// Handler for schema tools.
pub struct SchemaToolHandler<S> {
    source: Arc<S>,
    default_schema: String,
}

impl<S: ConnectionSource> SchemaToolHandler<S> {
    pub fn new(source: Arc<S>, default_schema: impl Into<String>) -> Self {
        Self {
            source,
            default_schema: default_schema.into(),
        }
    }

    /// The requested schema, or the default when none or a blank one was given.
    pub fn resolve_schema(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_schema.as_str())
            .to_string()
    }

    /// List tables and views with row counts.
    pub async fn list_tables(&self, input: SchemaInput) -> DbResult<ToolReport<ListTablesOutput>> {
        let schema = self.resolve_schema(input.schema.as_deref());
        info!(schema = %schema, "Listing tables");

        let mut conn = self.source.acquire().await?;
        let mut reader = CatalogReader::new(&mut conn, self.source.backend().dialect());

        match reader.list_tables(&schema).await {
            Ok(tables) => {
                info!(schema = %schema, count = tables.len(), "Found tables");
                Ok(ToolReport::Success(ListTablesOutput {
                    schema,
                    table_count: tables.len(),
                    tables,
                }))
            }
            Err(e) => {
                let message = format!(
                    "Failed to list tables in schema '{}': {}",
                    schema,
                    e.backend_message()
                );
                error!(schema = %schema, error = %e, "Failed to list tables");
                Ok(ToolReport::Failed(ErrorReport::new(message).with_schema(schema)))
            }
        }
    }

    /// Describe one table: columns, constraints, projections, size and counts.
    pub async fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> DbResult<ToolReport<DescribeTableOutput>> {
        let schema = self.resolve_schema(input.schema.as_deref());
        let table = input.table_name.trim().to_string();
        info!(schema = %schema, table = %table, "Describing table");

        let mut conn = self.source.acquire().await?;
        let mut reader = CatalogReader::new(&mut conn, self.source.backend().dialect());

        match describe(&mut reader, &schema, &table).await {
            Ok(output) => Ok(ToolReport::Success(output)),
            Err(e @ DbError::NotFound { .. }) => {
                warn!(schema = %schema, table = %table, "Table not found");
                Ok(ToolReport::Failed(ErrorReport::new(e.to_string())))
            }
            Err(e) => {
                let message = format!(
                    "Failed to describe table '{}.{}': {}",
                    schema,
                    table,
                    e.backend_message()
                );
                error!(schema = %schema, table = %table, error = %e, "Failed to describe table");
                Ok(ToolReport::Failed(
                    ErrorReport::new(message)
                        .with_schema(schema)
                        .with_table(table),
                ))
            }
        }
    }

    /// Foreign-key graph of a schema with one join suggestion per edge.
    pub async fn list_relationships(
        &self,
        input: SchemaInput,
    ) -> DbResult<ToolReport<RelationshipsOutput>> {
        let schema = self.resolve_schema(input.schema.as_deref());
        info!(schema = %schema, "Listing relationships");

        let mut conn = self.source.acquire().await?;
        let mut reader = CatalogReader::new(&mut conn, self.source.backend().dialect());

        match reader.list_foreign_keys(&schema).await {
            Ok(edges) => {
                let output = RelationshipsOutput::new(schema, edges);
                info!(
                    schema = %output.schema,
                    relationships = output.summary.total_relationships,
                    "Found relationships"
                );
                Ok(ToolReport::Success(output))
            }
            Err(e) => {
                let message = format!(
                    "Failed to list relationships in schema '{}': {}",
                    schema,
                    e.backend_message()
                );
                error!(schema = %schema, error = %e, "Failed to list relationships");
                Ok(ToolReport::Failed(ErrorReport::new(message).with_schema(schema)))
            }
        }
    }
}

async fn describe<C: SqlConnection>(
    reader: &mut CatalogReader<'_, C>,
    schema: &str,
    table: &str,
) -> DbResult<DescribeTableOutput> {
    let columns = reader.list_columns(schema, table).await?;
    if columns.is_empty() {
        return Err(DbError::not_found(schema, table));
    }

    let constraints = reader.list_constraints(schema, table).await?;
    let projections = if reader.dialect().supports_projections() {
        Some(reader.list_projections(schema, table).await?)
    } else {
        None
    };
    let row_count = RowCount::from(reader.probe_row_count(schema, table).await);
    let storage_bytes = RowCount::from(reader.probe_storage_bytes(schema, table).await);
    let storage_size = storage_bytes
        .exact()
        .map_or_else(|| storage_bytes.to_string(), format_size);

    let summary = DescribeSummary::compute(&columns, &constraints, projections.as_deref());
    Ok(DescribeTableOutput {
        schema: schema.to_string(),
        table_name: table.to_string(),
        columns,
        constraints,
        projections,
        row_count,
        storage_bytes,
        storage_size,
        summary,
    })
}
