//! Randomized tests for result normalization.
//!
//! Column lists are generated with heavy name collisions to check that every
//! record keeps one key per column, in column order, whatever the input shape.

mod common;

use catalog_mcp_server::db::{execute_normalized, normalize};
use catalog_mcp_server::models::{Backend, QueryOutcome};
use catalog_mcp_server::tools::{QueryInput, QueryToolHandler};
use common::ScriptedSource;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Value, json};
use std::collections::HashSet;

/// Random column name from a tiny alphabet so duplicates are common.
fn colliding_name(rng: &mut impl Rng) -> String {
    const NAMES: [&str; 5] = ["id", "name", "id_2", "value", "count"];
    NAMES[rng.gen_range(0..NAMES.len())].to_string()
}

fn random_value(rng: &mut impl Rng) -> Value {
    match rng.gen_range(0..5) {
        0 => Value::Null,
        1 => json!(rng.r#gen::<bool>()),
        2 => json!(rng.r#gen::<i64>()),
        3 => json!(rng.gen_range(-1000.0_f64..1000.0)),
        _ => json!(
            rng.sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect::<String>()
        ),
    }
}

fn edge_case_columns() -> Vec<Vec<String>> {
    vec![
        vec![],
        vec![String::new()],
        vec![String::new(), String::new()],
        vec!["a".into(); 10],
        vec!["x".into(), "x_2".into(), "x".into()],
        vec!["üñí".into(), "üñí".into()],
        vec!["?column?".into(), "?column?".into(), "?column?".into()],
    ]
}

#[test]
fn test_three_rows_two_columns_keep_order() {
    let outcome = QueryOutcome::projection(
        ["b", "a"],
        vec![
            vec![json!(1), json!("one")],
            vec![json!(2), json!("two")],
            vec![json!(3), json!("three")],
        ],
    );

    let normalized = normalize(outcome);
    assert_eq!(normalized.records.len(), 3);
    assert!(!normalized.is_effect());
    for (i, record) in normalized.records.iter().enumerate() {
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(record.get("b"), Some(&json!(i + 1)));
    }
}

#[test]
fn test_edge_case_columns_stay_unique() {
    for columns in edge_case_columns() {
        let row: Vec<Value> = (0..columns.len()).map(|i| json!(i)).collect();
        let normalized = normalize(QueryOutcome::projection(columns.clone(), vec![row]));
        let record = &normalized.records[0];

        assert_eq!(record.len(), columns.len(), "columns: {:?}", columns);
        let values: Vec<&Value> = record.values().collect();
        let expected: Vec<Value> = (0..columns.len()).map(|i| json!(i)).collect();
        assert_eq!(values, expected.iter().collect::<Vec<_>>());
    }
}

#[test]
fn test_fuzz_random_projections() {
    let mut rng = rand::thread_rng();

    for _ in 0..500 {
        let width = rng.gen_range(0..8);
        let columns: Vec<String> = (0..width).map(|_| colliding_name(&mut rng)).collect();
        let height = rng.gen_range(0..6);
        // Rows are ragged on purpose: short rows get padded, long rows truncated
        let rows: Vec<Vec<Value>> = (0..height)
            .map(|_| {
                let len = rng.gen_range(0..width + 3);
                (0..len).map(|_| random_value(&mut rng)).collect()
            })
            .collect();

        let normalized = normalize(QueryOutcome::projection(columns.clone(), rows.clone()));
        assert_eq!(normalized.records.len(), height);

        for (record, row) in normalized.records.iter().zip(&rows) {
            assert_eq!(record.len(), width, "columns: {:?}", columns);
            let keys: HashSet<&str> = record.keys().collect();
            assert_eq!(keys.len(), width);

            for (index, value) in record.values().enumerate() {
                let expected = row.get(index).cloned().unwrap_or(Value::Null);
                assert_eq!(value, &expected);
            }
        }
    }
}

#[test]
fn test_fuzz_described_rows_match_projection() {
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let width = rng.gen_range(1..6);
        let columns: Vec<String> = (0..width).map(|_| colliding_name(&mut rng)).collect();
        let row: Vec<Value> = (0..width).map(|_| random_value(&mut rng)).collect();

        let described = vec![columns.iter().cloned().zip(row.iter().cloned()).collect()];
        let from_described = normalize(QueryOutcome::DescribedRows(described));
        let from_projection = normalize(QueryOutcome::projection(columns, vec![row]));

        assert_eq!(from_described, from_projection);
    }
}

#[test]
fn test_effect_without_count_is_zero() {
    let normalized = normalize(QueryOutcome::Effect { rows_affected: None });
    assert!(normalized.records.is_empty());
    assert_eq!(normalized.rows_affected, Some(0));
}

#[test]
fn test_execute_normalized_wraps_failures_with_sql() {
    let source = ScriptedSource::builder(Backend::Postgres)
        .fail("FROM broken", "syntax error at or near \"FROM\"")
        .build();

    tokio_test::block_on(async {
        use catalog_mcp_server::db::ConnectionSource;

        let mut conn = source.acquire().await.unwrap();
        let err = execute_normalized(&mut conn, "SELECT FROM broken", &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "syntax error at or near \"FROM\"");
        match err {
            catalog_mcp_server::DbError::QueryExecution { sql, .. } => {
                assert_eq!(sql, "SELECT FROM broken")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    });
}

#[tokio::test]
async fn test_fuzz_query_tool_never_panics_on_odd_sql() {
    let source = ScriptedSource::builder(Backend::Postgres).build();
    let handler = QueryToolHandler::new(source);

    let inputs = [
        "'OR 1=1--".to_string(),
        "\0".to_string(),
        "üöÄ".repeat(100),
        "a".repeat(10_000),
        "SELECT 1; SELECT 2".to_string(),
    ];
    for sql in inputs {
        // Nothing is scripted, so every statement fails and is reported
        let failure = handler
            .query(QueryInput::new(sql.clone()))
            .await
            .unwrap()
            .failure()
            .unwrap();
        assert!(failure.error.starts_with("SQL execution failed: "));
        assert_eq!(failure.sql.as_deref(), Some(sql.as_str()));
    }
}
