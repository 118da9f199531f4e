//! Result normalization.
//!
//! Turns whatever a driver returned for one statement into an ordered list of
//! [`Record`]s, so callers never care which result shape the backend produced.

use crate::db::connection::SqlConnection;
use crate::error::{DbError, DbResult};
use crate::models::{QueryOutcome, QueryParam, Record};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Uniform result of one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// One record per returned row, in driver order
    pub records: Vec<Record>,
    /// Set only for statements that return no row set
    pub rows_affected: Option<u64>,
}

impl Normalized {
    pub fn is_effect(&self) -> bool {
        self.rows_affected.is_some()
    }
}

/// Convert a raw outcome into records.
///
/// Positional rows shorter than the column list are padded with nulls; extra
/// values beyond it are dropped. An effect whose count the driver could not
/// report is treated as zero rows affected.
pub fn normalize(outcome: QueryOutcome) -> Normalized {
    match outcome {
        QueryOutcome::Projection { columns, rows } => {
            let records = rows
                .into_iter()
                .map(|row| {
                    let mut values = row.into_iter();
                    Record::from_pairs(
                        columns
                            .iter()
                            .map(|column| (column.as_str(), values.next().unwrap_or(JsonValue::Null))),
                    )
                })
                .collect();
            Normalized {
                records,
                rows_affected: None,
            }
        }
        QueryOutcome::DescribedRows(rows) => Normalized {
            records: rows.into_iter().map(Record::from_pairs).collect(),
            rows_affected: None,
        },
        QueryOutcome::Effect { rows_affected } => Normalized {
            records: Vec::new(),
            rows_affected: Some(rows_affected.unwrap_or(0)),
        },
    }
}

/// Execute one statement and normalize its result.
///
/// Any failure comes back as [`DbError::QueryExecution`] carrying the SQL text.
pub async fn execute_normalized<C: SqlConnection>(
    conn: &mut C,
    sql: &str,
    params: &[QueryParam],
) -> DbResult<Normalized> {
    let outcome = conn
        .execute(sql, params)
        .await
        .map_err(|e| DbError::query_execution(&e, sql))?;
    let normalized = normalize(outcome);
    debug!(
        records = normalized.records.len(),
        rows_affected = ?normalized.rows_affected,
        "Statement normalized"
    );
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection_keeps_column_order() {
        let outcome = QueryOutcome::projection(
            ["zeta", "alpha"],
            vec![
                vec![json!(1), json!("a")],
                vec![json!(2), json!("b")],
                vec![json!(3), json!("c")],
            ],
        );
        let normalized = normalize(outcome);
        assert_eq!(normalized.records.len(), 3);
        assert_eq!(normalized.rows_affected, None);
        let keys: Vec<&str> = normalized.records[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(normalized.records[2].get("alpha"), Some(&json!("c")));
    }

    #[test]
    fn test_empty_projection_is_not_an_effect() {
        let normalized = normalize(QueryOutcome::projection(["id"], vec![]));
        assert!(normalized.records.is_empty());
        assert!(!normalized.is_effect());
    }

    #[test]
    fn test_short_row_is_padded_with_null() {
        let normalized = normalize(QueryOutcome::projection(["a", "b"], vec![vec![json!(1)]]));
        assert_eq!(normalized.records[0].get("b"), Some(&JsonValue::Null));
    }

    #[test]
    fn test_duplicate_columns_get_suffixes() {
        let normalized = normalize(QueryOutcome::projection(
            ["id", "id", "id"],
            vec![vec![json!(1), json!(2), json!(3)]],
        ));
        let keys: Vec<&str> = normalized.records[0].keys().collect();
        assert_eq!(keys, vec!["id", "id_2", "id_3"]);
    }

    #[test]
    fn test_described_rows() {
        let normalized = normalize(QueryOutcome::DescribedRows(vec![vec![
            ("name".to_string(), json!("x")),
            ("n".to_string(), json!(null)),
        ]]));
        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.records[0].text("name"), Some("x"));
    }

    #[test]
    fn test_effect_without_count_is_zero() {
        let normalized = normalize(QueryOutcome::Effect {
            rows_affected: None,
        });
        assert!(normalized.records.is_empty());
        assert_eq!(normalized.rows_affected, Some(0));

        let normalized = normalize(QueryOutcome::effect(4));
        assert_eq!(normalized.rows_affected, Some(4));
    }
}
