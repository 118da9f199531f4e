//! PostgreSQL catalog dialect, built on `information_schema`.
//!
//! `information_schema` columns are `sql_identifier`/`cardinal_number` domains, so
//! every projected column is cast to a plain type.

use super::{CatalogDialect, CatalogStatement, QueryHint, classify_object_type, quote_literal};
use crate::models::{Backend, ConstraintKind, ObjectKind};

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT
            t.table_name::text AS table_name,
            t.table_type::text AS table_type
        FROM information_schema.tables t
        WHERE t.table_schema = $1
        ORDER BY t.table_name
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            c.data_type::text AS data_type,
            c.is_nullable::text AS is_nullable,
            c.column_default::text AS column_default,
            c.character_maximum_length::int AS character_maximum_length,
            c.numeric_precision::int AS numeric_precision,
            c.numeric_scale::int AS numeric_scale
        FROM information_schema.columns c
        WHERE c.table_schema = $1 AND c.table_name = $2
        ORDER BY c.ordinal_position
        "#;

    // Referenced columns are matched by position so composite keys pair up.
    // NOT NULL shows up as a CHECK: synthesized as `2200_16385_1_not_null` before
    // PostgreSQL 18, catalogued with contype 'n' from 18 on. Both are skipped.
    pub const LIST_CONSTRAINTS: &str = r#"
        SELECT
            tc.constraint_name::text AS constraint_name,
            tc.constraint_type::text AS constraint_type,
            COALESCE(kcu.column_name, ccu.column_name)::text AS column_name,
            rkcu.table_name::text AS foreign_table_name,
            rkcu.column_name::text AS foreign_column_name
        FROM information_schema.table_constraints tc
        LEFT JOIN information_schema.key_column_usage kcu
            ON kcu.constraint_schema = tc.constraint_schema
            AND kcu.constraint_name = tc.constraint_name
            AND kcu.table_name = tc.table_name
        LEFT JOIN information_schema.constraint_column_usage ccu
            ON tc.constraint_type = 'CHECK'
            AND ccu.constraint_schema = tc.constraint_schema
            AND ccu.constraint_name = tc.constraint_name
        LEFT JOIN information_schema.referential_constraints rc
            ON rc.constraint_schema = tc.constraint_schema
            AND rc.constraint_name = tc.constraint_name
        LEFT JOIN information_schema.key_column_usage rkcu
            ON rkcu.constraint_schema = rc.unique_constraint_schema
            AND rkcu.constraint_name = rc.unique_constraint_name
            AND rkcu.ordinal_position = kcu.position_in_unique_constraint
        WHERE tc.table_schema = $1
            AND tc.table_name = $2
            AND NOT (
                tc.constraint_type = 'CHECK'
                AND (
                    tc.constraint_name ~ '^[0-9]+_[0-9]+_[0-9]+_not_null$'
                    OR EXISTS (
                        SELECT 1
                        FROM pg_catalog.pg_constraint pc
                        JOIN pg_catalog.pg_namespace pn ON pn.oid = pc.connamespace
                        WHERE pn.nspname = tc.constraint_schema
                            AND pc.conname = tc.constraint_name
                            AND pc.contype = 'n'
                    )
                )
            )
        ORDER BY tc.constraint_type, tc.constraint_name, kcu.ordinal_position
        "#;

    pub const LIST_FOREIGN_KEYS: &str = r#"
        SELECT
            kcu.table_name::text AS source_table,
            kcu.column_name::text AS source_column,
            rkcu.table_name::text AS target_table,
            rkcu.column_name::text AS target_column,
            tc.constraint_name::text AS constraint_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON kcu.constraint_schema = tc.constraint_schema
            AND kcu.constraint_name = tc.constraint_name
        JOIN information_schema.referential_constraints rc
            ON rc.constraint_schema = tc.constraint_schema
            AND rc.constraint_name = tc.constraint_name
        JOIN information_schema.key_column_usage rkcu
            ON rkcu.constraint_schema = rc.unique_constraint_schema
            AND rkcu.constraint_name = rc.unique_constraint_name
            AND rkcu.ordinal_position = kcu.position_in_unique_constraint
        WHERE tc.constraint_type = 'FOREIGN KEY'
            AND tc.table_schema = $1
        ORDER BY kcu.table_name, kcu.column_name
        "#;

    pub const STORAGE_BYTES: &str = r#"
        SELECT pg_total_relation_size(format('%I.%I', $1::text, $2::text)::regclass) AS storage_bytes
        "#;

    pub const CONNECTION_INFO: &str = r#"
        SELECT
            current_user::text AS username,
            current_database()::text AS database_name,
            version() AS version
        "#;

    pub const TABLE_COUNT: &str = r#"
        SELECT COUNT(*) AS table_count
        FROM information_schema.tables
        WHERE table_schema = $1
        "#;
}

/// Row-store catalog dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl CatalogDialect for PostgresDialect {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn tables_query(&self, schema: &str) -> CatalogStatement {
        CatalogStatement::new(queries::LIST_TABLES).bind(schema)
    }

    fn columns_query(&self, schema: &str, table: &str) -> CatalogStatement {
        CatalogStatement::new(queries::LIST_COLUMNS)
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
        classify_object_type(raw, "BASE TABLE")
    }

    fn classify_constraint(&self, raw: &str) -> ConstraintKind {
        ConstraintKind::parse(raw)
    }

    fn example_query(&self) -> &'static str {
        "SELECT current_user, current_database()"
    }

    fn query_hints(&self, schema: &str) -> Vec<QueryHint> {
        let schema = quote_literal(schema);
        vec![
            QueryHint::new(
                "List tables",
                "Tables and views in the schema",
                format!(
                    "SELECT table_name, table_type FROM information_schema.tables \
                     WHERE table_schema = {schema} ORDER BY table_name"
                ),
            ),
            QueryHint::new(
                "Largest tables",
                "Ten biggest tables including indexes and TOAST",
                format!(
                    "SELECT relname AS table_name, \
                     pg_size_pretty(pg_total_relation_size(relid)) AS total_size \
                     FROM pg_catalog.pg_statio_user_tables WHERE schemaname = {schema} \
                     ORDER BY pg_total_relation_size(relid) DESC LIMIT 10"
                ),
            ),
            QueryHint::new(
                "Active sessions",
                "Sessions currently running a statement",
                "SELECT pid, usename, state, query_start, left(query, 100) AS query \
                 FROM pg_stat_activity WHERE state <> 'idle' ORDER BY query_start",
            ),
            QueryHint::new(
                "Find columns by name",
                "Columns whose name contains a pattern",
                format!(
                    "SELECT table_name, column_name, data_type FROM information_schema.columns \
                     WHERE table_schema = {schema} AND column_name ILIKE '%id%' \
                     ORDER BY table_name, ordinal_position"
                ),
            ),
            QueryHint::new(
                "Index usage",
                "Indexes ordered by how rarely they are scanned",
                format!(
                    "SELECT relname AS table_name, indexrelname AS index_name, idx_scan \
                     FROM pg_stat_user_indexes WHERE schemaname = {schema} ORDER BY idx_scan"
                ),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryParam;

    #[test]
    fn test_classify_object() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.classify_object("BASE TABLE"), ObjectKind::Table);
        assert_eq!(dialect.classify_object("VIEW"), ObjectKind::View);
        assert_eq!(
            dialect.classify_object("LOCAL TEMPORARY"),
            ObjectKind::Other("local temporary".to_string())
        );
        // Vertica's spelling is not a table here
        assert_eq!(
            dialect.classify_object("TABLE"),
            ObjectKind::Other("table".to_string())
        );
    }

    #[test]
    fn test_queries_use_numbered_placeholders() {
        let statement = PostgresDialect.columns_query("sales", "orders");
        assert!(statement.sql.contains("$1") && statement.sql.contains("$2"));
        assert_eq!(
            statement.params,
            vec![QueryParam::from("sales"), QueryParam::from("orders")]
        );
    }

    #[test]
    fn test_constraints_skip_only_synthesized_not_null_checks() {
        let statement = PostgresDialect.constraints_query("public", "products");
        // Synthesized names look like 2200_16385_1_not_null
        assert!(statement.sql.contains("'^[0-9]+_[0-9]+_[0-9]+_not_null$'"));
        assert!(statement.sql.contains("tc.constraint_type = 'CHECK'"));
        assert!(statement.sql.contains("pc.contype = 'n'"));
        assert!(!statement.sql.contains("NOT LIKE"));
    }

    #[test]
    fn test_has_storage_but_no_projections() {
        assert!(PostgresDialect.storage_query("public", "t").is_some());
        assert!(PostgresDialect.projections_query("public", "t").is_none());
    }

    #[test]
    fn test_hints_embed_quoted_schema() {
        let hints = PostgresDialect.query_hints("o'hare");
        assert_eq!(hints.len(), 5);
        assert!(hints[0].sql.contains("'o''hare'"));
    }
}
