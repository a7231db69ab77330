//! The `may_postgres` executor.
//!
//! Bridges the [`StoreExecutor`] seam to a live connection: outgoing
//! `sea_query::Value` parameters become `ToSql` trait objects, incoming
//! driver rows become owned [`Row`]s keyed by column name.
//!
//! Parameter conversion is two-pass: collect owned, typed values first,
//! then build the reference slice, so the references stay valid for the
//! duration of the call. Nulls are boxed as typed `Option`s so the driver
//! still knows the parameter's wire type.

use may_postgres::types::ToSql;
use may_postgres::Client;
use sea_query::Value;

use crate::error::StoreError;
use crate::executor::StoreExecutor;
use crate::value::Row;

/// [`StoreExecutor`] over a single `may_postgres` connection.
///
/// `may_postgres` multiplexes pipelined statements over one socket, so a
/// shared reference is all callers need; coroutines block only on their own
/// responses.
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// First pass of parameter conversion: every value becomes an owned,
/// typed `ToSql` box, with nulls kept as typed `Option`s.
fn to_sql_params(params: &[Value]) -> Result<Vec<Box<dyn ToSql>>, StoreError> {
    let mut owned: Vec<Box<dyn ToSql>> = Vec::with_capacity(params.len());
    for value in params {
        match value {
            Value::Bool(b) => owned.push(Box::new(*b)),
            Value::SmallInt(i) => owned.push(Box::new(*i)),
            Value::Int(i) => owned.push(Box::new(*i)),
            Value::BigInt(i) => owned.push(Box::new(*i)),
            Value::Float(f) => owned.push(Box::new(*f)),
            Value::Double(d) => owned.push(Box::new(*d)),
            Value::String(s) => owned.push(Box::new(s.clone())),
            Value::Decimal(d) => owned.push(Box::new(*d)),
            Value::ChronoDateTime(t) => owned.push(Box::new(*t)),
            Value::Json(j) => owned.push(Box::new(j.as_deref().cloned())),
            other => {
                return Err(StoreError::Storage(format!(
                    "unsupported parameter type: {other:?}"
                )));
            }
        }
    }
    Ok(owned)
}

/// Decode one driver row into an owned [`Row`] by column type name.
fn decode_row(row: &may_postgres::Row) -> Result<Row, StoreError> {
    let mut columns = Vec::with_capacity(row.columns().len());
    let mut values = Vec::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = match column.type_().name() {
            "bool" => Value::Bool(try_column(row, i)?),
            "int2" => Value::SmallInt(try_column(row, i)?),
            "int4" => Value::Int(try_column(row, i)?),
            "int8" => Value::BigInt(try_column(row, i)?),
            "float4" => Value::Float(try_column(row, i)?),
            "float8" => Value::Double(try_column(row, i)?),
            "varchar" | "text" | "bpchar" | "name" => Value::String(try_column(row, i)?),
            "numeric" => Value::Decimal(try_column(row, i)?),
            "timestamp" => Value::ChronoDateTime(try_column(row, i)?),
            other => {
                return Err(StoreError::Storage(format!(
                    "unsupported column type {other:?} for column {:?}",
                    column.name()
                )));
            }
        };
        columns.push(column.name().to_owned());
        values.push(value);
    }
    Ok(Row::new(columns, values))
}

fn try_column<'a, T>(row: &'a may_postgres::Row, i: usize) -> Result<Option<T>, StoreError>
where
    T: may_postgres::types::FromSql<'a>,
{
    row.try_get::<usize, Option<T>>(i)
        .map_err(|e| StoreError::Storage(format!("failed to decode column {i}: {e}")))
}

impl StoreExecutor for MayPostgresExecutor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        let owned = to_sql_params(params)?;
        let refs: Vec<&dyn ToSql> = owned.iter().map(AsRef::as_ref).collect();
        self.client
            .execute(sql, &refs)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let owned = to_sql_params(params)?;
        let refs: Vec<&dyn ToSql> = owned.iter().map(AsRef::as_ref).collect();
        let rows = self
            .client
            .query(sql, &refs)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        rows.iter().map(decode_row).collect()
    }

    fn query_opt(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        let owned = to_sql_params(params)?;
        let refs: Vec<&dyn ToSql> = owned.iter().map(AsRef::as_ref).collect();
        let rows = self
            .client
            .query(sql, &refs)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        match rows.first() {
            Some(row) => Ok(Some(decode_row(row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_params_convert_to_typed_boxes() {
        let boxes = to_sql_params(&[
            Value::Int(None),
            Value::String(None),
            Value::Bool(Some(true)),
        ])
        .unwrap();
        assert_eq!(boxes.len(), 3);
    }

    #[test]
    fn test_unsupported_param_is_storage_error() {
        let err = to_sql_params(&[Value::Bytes(None)]).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
