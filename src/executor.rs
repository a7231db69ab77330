//! The storage execution seam.
//!
//! Every statement the crate issues, schema or data, goes through
//! [`StoreExecutor`]. The production implementation wraps a `may_postgres`
//! client; transactions delegate to whatever executor opened them; the
//! mock executor scripts results for tests. Callers never see the driver.

use sea_query::Value;

use crate::error::StoreError;
use crate::value::Row;

/// Execution of SQL statements against the backing store.
///
/// Parameters travel as `sea_query::Value`s and results come back as owned
/// [`Row`]s, so the trait is object-safe and implementable without a
/// database behind it.
pub trait StoreExecutor {
    /// Run a statement that returns no rows.
    ///
    /// # Arguments
    ///
    /// * `sql` - The statement, with `$n` placeholders
    /// * `params` - Values bound to the placeholders in order
    ///
    /// # Returns
    ///
    /// The number of rows affected.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the engine rejects the statement.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError>;

    /// Run a query and collect every result row.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the engine rejects the query.
    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;

    /// Run a query expected to yield at most one row.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the engine rejects the query.
    fn query_opt(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError>;
}
