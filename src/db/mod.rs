//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection seam traits and backend selection
//! - The sqlx-backed PostgreSQL pool and the Vertica session driver
//! - Result normalization into records
//! - Catalog introspection for each backend
//! - Type mappings

pub mod catalog;
pub mod connection;
pub mod normalizer;
pub mod pool;
pub mod provider;
pub mod types;
pub mod vertica;

pub use catalog::{CatalogDialect, CatalogReader, CatalogStatement, QueryHint};
pub use connection::{ConnectionSource, SqlConnection};
pub use normalizer::{Normalized, execute_normalized, normalize};
pub use pool::{PgConnectionProvider, PgSession};
pub use provider::{DatabaseProvider, DatabaseSession};
pub use vertica::{VerticaConnectionProvider, VerticaSession};
