//! Connection seam between the catalog layer and a database driver.
//!
//! Everything above this module talks to a database only through these two traits,
//! so reports can be exercised against a scripted connection in tests.

use crate::error::DbResult;
use crate::models::{Backend, QueryOutcome, QueryParam};
use std::future::Future;

/// A live connection able to run one statement at a time.
pub trait SqlConnection: Send {
    /// Execute a single statement with positional parameters.
    ///
    /// Returns the raw outcome; turning it into records is the normalizer's job.
    fn execute(
        &mut self,
        sql: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = DbResult<QueryOutcome>> + Send;
}

/// Hands out connections for the duration of one operation.
///
/// Lifecycle: open before first use, acquire per call (the connection is released
/// when dropped), close explicitly at shutdown.
pub trait ConnectionSource: Send + Sync {
    type Connection: SqlConnection;

    /// Which catalog dialect the connections speak.
    fn backend(&self) -> Backend;

    /// Connection URL with credentials masked, for display.
    fn masked_url(&self) -> String;

    /// Acquire a connection scoped to the caller.
    fn acquire(&self) -> impl Future<Output = DbResult<Self::Connection>> + Send;

    /// Release every underlying connection. Later acquisitions fail.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
