//! Owned result rows and type-checked value extraction.
//!
//! The executor seam hands results back as [`Row`]s: column names paired
//! with [`sea_query::Value`]s. [`FromSqlValue`] extracts Rust values from
//! them, distinguishing null from type mismatch so failures carry a useful
//! message instead of a panic.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_query::Value;

use crate::error::StoreError;

/// Error type for value extraction failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value is null (None variant)
    Null,
    /// The value type doesn't match the expected type
    TypeMismatch { expected: &'static str, actual: String },
}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueError::Null => write!(f, "value is null"),
            ValueError::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for ValueError {}

/// Extraction of a Rust value from a `sea_query::Value`.
pub trait FromSqlValue: Sized {
    /// Extract a non-null value.
    ///
    /// # Errors
    ///
    /// `ValueError::Null` for a null of the right type,
    /// `ValueError::TypeMismatch` for anything else.
    fn from_value(value: Value) -> Result<Self, ValueError>;

    /// Extract a value, mapping null to `None`.
    fn from_value_opt(value: Value) -> Result<Option<Self>, ValueError> {
        match Self::from_value(value) {
            Ok(v) => Ok(Some(v)),
            Err(ValueError::Null) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

macro_rules! impl_from_sql_value {
    ($type:ty, $variant:ident, $expected:expr) => {
        impl FromSqlValue for $type {
            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(Some(v)) => Ok(v),
                    Value::$variant(None) => Err(ValueError::Null),
                    other => Err(ValueError::TypeMismatch {
                        expected: $expected,
                        actual: format!("{other:?}"),
                    }),
                }
            }
        }
    };
}

impl_from_sql_value!(i16, SmallInt, "SmallInt");
impl_from_sql_value!(i32, Int, "Int");
impl_from_sql_value!(i64, BigInt, "BigInt");
impl_from_sql_value!(f64, Double, "Double");
impl_from_sql_value!(bool, Bool, "Bool");
impl_from_sql_value!(String, String, "String");
impl_from_sql_value!(Decimal, Decimal, "Decimal");
impl_from_sql_value!(NaiveDateTime, ChronoDateTime, "ChronoDateTime");

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        T::from_value_opt(value)
    }
}

/// Build a `Value` carrying a NUMERIC amount.
pub fn decimal_value(d: Decimal) -> Value {
    Value::Decimal(Some(d))
}

/// Build a `Value` carrying a timestamp.
pub fn timestamp_value(t: NaiveDateTime) -> Value {
    Value::ChronoDateTime(Some(t))
}

/// An owned result row: column names paired with values.
///
/// Rows are produced by executor implementations (decoded from the driver,
/// or scripted by the mock) and consumed by the repository's model types.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(c, v)| (c.into(), v))
            .unzip();
        Self { columns, values }
    }

    /// Raw access to a column's value.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Extract a typed value from a named column.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the column is absent or the value does not
    /// extract as `T` (use `Option<T>` for nullable columns).
    pub fn try_get<T: FromSqlValue>(&self, column: &str) -> Result<T, StoreError> {
        let value = self
            .value(column)
            .ok_or_else(|| StoreError::Storage(format!("column {column:?} missing from result row")))?;
        T::from_value(value.clone())
            .map_err(|e| StoreError::Storage(format!("column {column:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::from_pairs([
            ("id", Value::Int(Some(7))),
            ("name", Value::String(Some("PC".to_owned()))),
            ("model", Value::String(None)),
            ("is_broken", Value::Bool(Some(false))),
        ])
    }

    #[test]
    fn test_try_get_typed_values() {
        let row = sample_row();
        assert_eq!(row.try_get::<i32>("id").unwrap(), 7);
        assert_eq!(row.try_get::<String>("name").unwrap(), "PC");
        assert!(!row.try_get::<bool>("is_broken").unwrap());
    }

    #[test]
    fn test_nullable_column_extracts_as_none() {
        let row = sample_row();
        assert_eq!(row.try_get::<Option<String>>("model").unwrap(), None);
        assert_eq!(
            row.try_get::<Option<String>>("name").unwrap(),
            Some("PC".to_owned())
        );
    }

    #[test]
    fn test_null_and_mismatch_are_distinct() {
        assert_eq!(
            <String as FromSqlValue>::from_value(Value::String(None)),
            Err(ValueError::Null)
        );
        let err = <String as FromSqlValue>::from_value(Value::Int(Some(1))).unwrap_err();
        assert!(matches!(err, ValueError::TypeMismatch { expected: "String", .. }));
    }

    #[test]
    fn test_missing_column_is_storage_error() {
        let err = sample_row().try_get::<i32>("nope").unwrap_err();
        assert!(err.to_string().contains("missing from result row"));
    }

    #[test]
    fn test_timestamp_extraction() {
        let issued = NaiveDateTime::parse_from_str("2024-05-01 12:30:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let row = Row::from_pairs([
            ("issue_date", timestamp_value(issued)),
            ("returned_at", Value::ChronoDateTime(None)),
        ]);
        assert_eq!(row.try_get::<NaiveDateTime>("issue_date").unwrap(), issued);
        assert_eq!(row.try_get::<Option<NaiveDateTime>>("returned_at").unwrap(), None);
    }

    #[test]
    fn test_decimal_extraction() {
        let row = Row::from_pairs([("cost", decimal_value(Decimal::new(1999, 2)))]);
        assert_eq!(
            row.try_get::<Decimal>("cost").unwrap(),
            Decimal::new(1999, 2)
        );
    }
}
