//! Schema-related data models.
//!
//! These are the normalized shapes both backends' catalogs are reconciled into.

use crate::models::record::RowCount;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// Kind of catalog object a listing row describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
    /// Anything else, carrying the lower-cased raw catalog type
    Other(String),
}

impl ObjectKind {
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One row of a table listing.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table_name: String,
    pub table_type: ObjectKind,
    pub row_count: RowCount,
    /// Backend-specific columns of the listing query (e.g. projection count)
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl TableSummary {
    pub fn new(table_name: impl Into<String>, table_type: ObjectKind) -> Self {
        Self {
            table_name: table_name.into(),
            table_type,
            row_count: RowCount::NotApplicable,
            extra: Map::new(),
        }
    }

    pub fn with_row_count(mut self, row_count: RowCount) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type as the backend spells it
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_maximum_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_precision: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_scale: Option<u64>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default: None,
            character_maximum_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_character_length(mut self, length: u64) -> Self {
        self.character_maximum_length = Some(length);
        self
    }

    pub fn with_numeric(mut self, precision: Option<u64>, scale: Option<u64>) -> Self {
        self.numeric_precision = precision;
        self.numeric_scale = scale;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
    Other,
}

impl ConstraintKind {
    /// Parse the SQL-standard constraint type names used by `information_schema`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PRIMARY KEY" => Self::PrimaryKey,
            "FOREIGN KEY" => Self::ForeignKey,
            "UNIQUE" => Self::Unique,
            "CHECK" => Self::Check,
            _ => Self::Other,
        }
    }

    /// Parse the single-letter codes catalogs such as `pg_constraint` and
    /// `v_catalog.constraint_columns` use.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "p" => Self::PrimaryKey,
            "f" => Self::ForeignKey,
            "u" => Self::Unique,
            "c" => Self::Check,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrimaryKey => write!(f, "PRIMARY KEY"),
            Self::ForeignKey => write!(f, "FOREIGN KEY"),
            Self::Unique => write!(f, "UNIQUE"),
            Self::Check => write!(f, "CHECK"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// One column's participation in one constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintDescriptor {
    pub constraint_name: String,
    pub constraint_type: ConstraintKind,
    pub column_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_column_name: Option<String>,
}

impl ConstraintDescriptor {
    pub fn new(
        constraint_name: impl Into<String>,
        constraint_type: ConstraintKind,
        column_name: Option<String>,
    ) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            constraint_type,
            column_name,
            foreign_table_name: None,
            foreign_column_name: None,
        }
    }

    /// Set the referenced table and column. Ignored unless this is a foreign key.
    pub fn with_target(mut self, table: Option<String>, column: Option<String>) -> Self {
        if self.constraint_type == ConstraintKind::ForeignKey {
            self.foreign_table_name = table;
            self.foreign_column_name = column;
        }
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraint_type == ConstraintKind::PrimaryKey
    }

    pub fn is_foreign_key(&self) -> bool {
        self.constraint_type == ConstraintKind::ForeignKey
    }
}

/// A foreign-key edge between two tables of one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipEdge {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub constraint_name: String,
}

impl RelationshipEdge {
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
        constraint_name: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
            constraint_name: constraint_name.into(),
        }
    }
}

/// Physical storage layout of a table on the columnar backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionDescriptor {
    pub projection_name: String,
    pub is_super_projection: Option<bool>,
    pub is_segmented: Option<bool>,
    pub is_up_to_date: Option<bool>,
}
