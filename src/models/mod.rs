//! Data models for the catalog MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod record;
pub mod schema;

// Re-export commonly used types
pub use connection::{Backend, ConnectionSettings};
pub use query::{DescribedRow, QueryOutcome, QueryParam};
pub use record::{NOT_APPLICABLE, Record, RowCount};
pub use schema::{
    ColumnDescriptor, ConstraintDescriptor, ConstraintKind, ObjectKind, ProjectionDescriptor,
    RelationshipEdge, TableSummary,
};
