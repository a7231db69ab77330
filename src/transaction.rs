//! Transaction control over the executor seam.
//!
//! Transactions are plain SQL statements (`BEGIN` / `COMMIT` / `ROLLBACK`)
//! issued through the same [`StoreExecutor`] the rest of the crate uses, so
//! any executor, including the mock, participates. A [`Transaction`] is
//! itself an executor; statements run inside it delegate to the connection
//! that opened it.

use sea_query::Value;

use crate::error::StoreError;
use crate::executor::StoreExecutor;
use crate::value::Row;

/// An open transaction on an executor.
///
/// Dropping an uncommitted transaction rolls it back.
pub struct Transaction<'a> {
    executor: &'a dyn StoreExecutor,
    closed: bool,
}

impl<'a> Transaction<'a> {
    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when `BEGIN` fails.
    pub fn begin(executor: &'a dyn StoreExecutor) -> Result<Self, StoreError> {
        executor.execute("BEGIN", &[])?;
        Ok(Self { executor, closed: false })
    }

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when `COMMIT` fails.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.closed = true;
        self.executor.execute("COMMIT", &[])?;
        Ok(())
    }

    /// Roll the transaction back.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when `ROLLBACK` fails.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.closed = true;
        self.executor.execute("ROLLBACK", &[])?;
        Ok(())
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Storage("transaction already closed".to_owned()));
        }
        Ok(())
    }
}

impl StoreExecutor for Transaction<'_> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        self.guard()?;
        self.executor.execute(sql, params)
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        self.guard()?;
        self.executor.query_all(sql, params)
    }

    fn query_opt(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        self.guard()?;
        self.executor.query_opt(sql, params)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.executor.execute("ROLLBACK", &[]) {
                log::error!("rollback of abandoned transaction failed: {e}");
            }
        }
    }
}

/// Run `f` inside a transaction, committing on success and rolling back on
/// error.
///
/// The original error from `f` is preserved; a failed rollback is logged
/// but does not mask it.
///
/// # Errors
///
/// Whatever `f` returns, or `StoreError::Storage` from transaction control.
pub fn with_transaction<T, F>(executor: &dyn StoreExecutor, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
{
    let tx = Transaction::begin(executor)?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback() {
                log::error!("rollback failed after {e}: {rb}");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    #[test]
    fn test_commit_path_issues_begin_then_commit() {
        let mock = MockExecutor::new();
        with_transaction(&mock, |tx| tx.execute("UPDATE t SET q = 1", &[]).map(|_| ())).unwrap();
        assert_eq!(mock.issued_sql(), vec!["BEGIN", "UPDATE t SET q = 1", "COMMIT"]);
    }

    #[test]
    fn test_error_path_rolls_back_and_preserves_error() {
        let mock = MockExecutor::new();
        let err = with_transaction(&mock, |_tx| {
            Err::<(), _>(StoreError::NotFound("category 9".into()))
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(mock.issued_sql(), vec!["BEGIN", "ROLLBACK"]);
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let mock = MockExecutor::new();
        {
            let _tx = Transaction::begin(&mock).unwrap();
        }
        assert_eq!(mock.issued_sql(), vec!["BEGIN", "ROLLBACK"]);
    }

    #[test]
    fn test_statement_failure_inside_closure_rolls_back() {
        let mock = MockExecutor::new()
            .append_execute_results(vec![1]) // BEGIN
            .append_execute_errors(vec!["duplicate key".into()]);
        let err = with_transaction(&mock, |tx| tx.execute("INSERT", &[]).map(|_| ())).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(mock.issued_sql(), vec!["BEGIN", "INSERT", "ROLLBACK"]);
    }
}
