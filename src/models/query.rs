//! Query-related data models.
//!
//! This module defines bind parameters and the raw outcome of an executed statement,
//! before it is normalized into records.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A parameter value for parameterized statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// One self-describing row: every value carries the column name it came from.
pub type DescribedRow = Vec<(String, JsonValue)>;

/// What a driver hands back after executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows as positional tuples plus a separate column-name list.
    Projection {
        columns: Vec<String>,
        rows: Vec<Vec<JsonValue>>,
    },
    /// Rows that carry their own column names.
    DescribedRows(Vec<DescribedRow>),
    /// Statement produced no rows. `None` when the driver cannot report a count.
    Effect { rows_affected: Option<u64> },
}

impl QueryOutcome {
    /// Positional projection from borrowed column names.
    pub fn projection<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<JsonValue>>,
    ) -> Self {
        Self::Projection {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    pub fn effect(rows_affected: u64) -> Self {
        Self::Effect {
            rows_affected: Some(rows_affected),
        }
    }

    /// Check whether the statement produced a row set (possibly empty).
    pub fn is_projection(&self) -> bool {
        !matches!(self, Self::Effect { .. })
    }
}
