//! A scripted [`StoreExecutor`] for driving the crate without a database.
//!
//! Results are queued up front with the `append_*` builder methods and
//! popped in order as statements arrive; every statement is also recorded
//! in a transcript so tests can assert on exactly what SQL was issued, in
//! what order, with what parameters.
//!
//! When a queue runs dry the mock answers with a benign default (no rows,
//! one row affected) so tests only script the statements they care about.

use std::cell::RefCell;
use std::collections::VecDeque;

use sea_query::Value;

use crate::error::StoreError;
use crate::executor::StoreExecutor;
use crate::value::Row;

/// One statement as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug)]
enum QueryOutcome {
    Rows(Vec<Row>),
    Error(String),
}

#[derive(Debug)]
enum ExecOutcome {
    Affected(u64),
    Error(String),
}

/// Scripted executor double.
#[derive(Debug, Default)]
pub struct MockExecutor {
    query_results: RefCell<VecDeque<QueryOutcome>>,
    execute_results: RefCell<VecDeque<ExecOutcome>>,
    transcript: RefCell<Vec<Statement>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue result sets for upcoming queries, consumed in order.
    pub fn append_query_results(self, results: Vec<Vec<Row>>) -> Self {
        self.query_results
            .borrow_mut()
            .extend(results.into_iter().map(QueryOutcome::Rows));
        self
    }

    /// Queue query failures, consumed in order alongside scripted results.
    pub fn append_query_errors(self, errors: Vec<String>) -> Self {
        self.query_results
            .borrow_mut()
            .extend(errors.into_iter().map(QueryOutcome::Error));
        self
    }

    /// Queue affected-row counts for upcoming execute calls.
    pub fn append_execute_results(self, results: Vec<u64>) -> Self {
        self.execute_results
            .borrow_mut()
            .extend(results.into_iter().map(ExecOutcome::Affected));
        self
    }

    /// Queue execute failures, consumed in order alongside scripted counts.
    pub fn append_execute_errors(self, errors: Vec<String>) -> Self {
        self.execute_results
            .borrow_mut()
            .extend(errors.into_iter().map(ExecOutcome::Error));
        self
    }

    /// Every statement issued so far, in order.
    pub fn transcript(&self) -> Vec<Statement> {
        self.transcript.borrow().clone()
    }

    /// The SQL strings of the transcript, for order assertions.
    pub fn issued_sql(&self) -> Vec<String> {
        self.transcript.borrow().iter().map(|s| s.sql.clone()).collect()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.transcript.borrow_mut().push(Statement {
            sql: sql.to_owned(),
            params: params.to_vec(),
        });
    }
}

impl StoreExecutor for MockExecutor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        self.record(sql, params);
        match self.execute_results.borrow_mut().pop_front() {
            Some(ExecOutcome::Affected(n)) => Ok(n),
            Some(ExecOutcome::Error(msg)) => Err(StoreError::Storage(msg)),
            None => Ok(1),
        }
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        self.record(sql, params);
        match self.query_results.borrow_mut().pop_front() {
            Some(QueryOutcome::Rows(rows)) => Ok(rows),
            Some(QueryOutcome::Error(msg)) => Err(StoreError::Storage(msg)),
            None => Ok(Vec::new()),
        }
    }

    fn query_opt(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        self.record(sql, params);
        match self.query_results.borrow_mut().pop_front() {
            Some(QueryOutcome::Rows(rows)) => Ok(rows.into_iter().next()),
            Some(QueryOutcome::Error(msg)) => Err(StoreError::Storage(msg)),
            None => Ok(None),
        }
    }
}
