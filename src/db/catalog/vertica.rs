//! Vertica catalog dialect, built on `v_catalog` and `v_monitor`.
//!
//! Vertica binds `?` placeholders, so statements that reuse a value bind it twice.

use super::{CatalogDialect, CatalogStatement, QueryHint, classify_object_type, quote_literal};
use crate::models::{Backend, ConstraintKind, ObjectKind};

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT
            a.table_name,
            a.table_type,
            COALESCE(t.owner_name, v.owner_name) AS owner_name,
            (SELECT COUNT(*)
                FROM v_catalog.projections p
                WHERE p.projection_schema = a.schema_name
                AND p.anchor_table_name = a.table_name) AS projection_count
        FROM v_catalog.all_tables a
        LEFT JOIN v_catalog.tables t
            ON t.table_schema = a.schema_name AND t.table_name = a.table_name
        LEFT JOIN v_catalog.views v
            ON v.table_schema = a.schema_name AND v.table_name = a.table_name
        WHERE a.schema_name = ?
        ORDER BY a.table_name
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT column_name, data_type, is_nullable, column_default,
            character_maximum_length, numeric_precision, numeric_scale
        FROM (
            SELECT column_name, data_type, is_nullable, column_default,
                character_maximum_length, numeric_precision, numeric_scale, ordinal_position
            FROM v_catalog.columns
            WHERE table_schema = ? AND table_name = ?
            UNION ALL
            SELECT column_name, data_type, TRUE AS is_nullable, NULL AS column_default,
                character_maximum_length, numeric_precision, numeric_scale, ordinal_position
            FROM v_catalog.view_columns
            WHERE table_schema = ? AND table_name = ?
        ) cols
        ORDER BY ordinal_position
        "#;

    // constraint_type 'n' is NOT NULL and is not reported as a constraint.
    pub const LIST_CONSTRAINTS: &str = r#"
        SELECT
            constraint_name,
            constraint_type,
            column_name,
            reference_table_name AS foreign_table_name,
            reference_column_name AS foreign_column_name
        FROM v_catalog.constraint_columns
        WHERE table_schema = ? AND table_name = ? AND constraint_type <> 'n'
        ORDER BY constraint_type, constraint_name, column_name
        "#;

    pub const LIST_FOREIGN_KEYS: &str = r#"
        SELECT
            table_name AS source_table,
            column_name AS source_column,
            reference_table_name AS target_table,
            reference_column_name AS target_column,
            constraint_name
        FROM v_catalog.foreign_keys
        WHERE table_schema = ?
        ORDER BY table_name, column_name
        "#;

    pub const LIST_PROJECTIONS: &str = r#"
        SELECT projection_name, is_super_projection, is_segmented, is_up_to_date
        FROM v_catalog.projections
        WHERE projection_schema = ? AND anchor_table_name = ?
        ORDER BY projection_name
        "#;

    pub const STORAGE_BYTES: &str = r#"
        SELECT COALESCE(SUM(used_bytes), 0) AS storage_bytes
        FROM v_monitor.projection_storage
        WHERE anchor_table_schema = ? AND anchor_table_name = ?
        "#;

    pub const CONNECTION_INFO: &str = r#"
        SELECT
            current_user() AS username,
            current_database() AS database_name,
            version() AS version
        "#;

    pub const TABLE_COUNT: &str = r#"
        SELECT COUNT(*) AS table_count
        FROM v_catalog.all_tables
        WHERE schema_name = ?
            AND table_type IN ('TABLE', 'VIEW')
        "#;
}

/// Columnar catalog dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerticaDialect;

impl CatalogDialect for VerticaDialect {
    fn backend(&self) -> Backend {
        Backend::Vertica
    }

    fn tables_query(&self, schema: &str) -> CatalogStatement {
        CatalogStatement::new(queries::LIST_TABLES).bind(schema)
    }

    fn columns_query(&self, schema: &str, table: &str) -> CatalogStatement {
        CatalogStatement::new(queries::LIST_COLUMNS)
            .bind(schema)
            .bind(table)
            .bind(schema)
            .bind(table)
    }

    fn constraints_query(&self, schema: &str, table: &str) -> CatalogStatement {
        CatalogStatement::new(queries::LIST_CONSTRAINTS)
            .bind(schema)
            .bind(table)
    }

    fn foreign_keys_query(&self, schema: &str) -> CatalogStatement {
        CatalogStatement::new(queries::LIST_FOREIGN_KEYS).bind(schema)
    }

    fn supports_projections(&self) -> bool {
        true
    }

    fn projections_query(&self, schema: &str, table: &str) -> Option<CatalogStatement> {
        Some(
            CatalogStatement::new(queries::LIST_PROJECTIONS)
                .bind(schema)
                .bind(table),
        )
    }

    fn storage_query(&self, schema: &str, table: &str) -> Option<CatalogStatement> {
        Some(
            CatalogStatement::new(queries::STORAGE_BYTES)
                .bind(schema)
                .bind(table),
        )
    }

    fn connection_info_query(&self) -> CatalogStatement {
        CatalogStatement::new(queries::CONNECTION_INFO)
    }

    fn table_count_query(&self, schema: &str) -> CatalogStatement {
        CatalogStatement::new(queries::TABLE_COUNT).bind(schema)
    }

    fn classify_object(&self, raw: &str) -> ObjectKind {
        classify_object_type(raw, "TABLE")
    }

    fn classify_constraint(&self, raw: &str) -> ConstraintKind {
        ConstraintKind::from_code(raw)
    }

    fn example_query(&self) -> &'static str {
        "SELECT current_user(), current_database()"
    }

    fn query_hints(&self, schema: &str) -> Vec<QueryHint> {
        let schema = quote_literal(schema);
        vec![
            QueryHint::new(
                "List tables",
                "Tables in the schema with their owners",
                format!(
                    "SELECT table_name, owner_name, create_time FROM v_catalog.tables \
                     WHERE table_schema = {schema} ORDER BY table_name"
                ),
            ),
            QueryHint::new(
                "Projections",
                "Physical projections backing each table",
                format!(
                    "SELECT projection_name, anchor_table_name, is_super_projection, is_segmented \
                     FROM v_catalog.projections WHERE projection_schema = {schema} \
                     ORDER BY anchor_table_name, projection_name"
                ),
            ),
            QueryHint::new(
                "Storage by table",
                "Bytes used per table across all projections",
                format!(
                    "SELECT anchor_table_name, SUM(used_bytes) AS used_bytes \
                     FROM v_monitor.projection_storage WHERE anchor_table_schema = {schema} \
                     GROUP BY anchor_table_name ORDER BY used_bytes DESC"
                ),
            ),
            QueryHint::new(
                "Active sessions",
                "Sessions currently running a statement",
                "SELECT user_name, session_id, statement_start, current_statement \
                 FROM v_monitor.sessions WHERE statement_id IS NOT NULL",
            ),
            QueryHint::new(
                "Slowest recent queries",
                "Ten longest-running requests still in the monitor history",
                "SELECT user_name, request_duration_ms, LEFT(request, 100) AS request \
                 FROM v_monitor.query_requests WHERE request_duration_ms IS NOT NULL \
                 ORDER BY request_duration_ms DESC LIMIT 10",
            ),
        ]
    }
}
