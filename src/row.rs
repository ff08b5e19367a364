//! Driver-neutral parameter and column values
//!
//! The migrator only ever binds and reads three kinds of data (ids, names and
//! timestamps), so rather than leaking a driver's `ToSql`/`Row` types through
//! every trait, statements are bound with [`Value`]s and results come back as
//! [`Row`]s. Backends convert at the edge.

use crate::executor::DbError;
use chrono::{DateTime, Utc};

/// A single bound parameter or result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// 64-bit signed integer (`BIGINT`)
    BigInt(i64),
    /// Text (`TEXT` / `VARCHAR`)
    Text(String),
    /// Timestamp with time zone, normalised to UTC
    Timestamp(DateTime<Utc>),
    /// SQL `NULL`
    Null,
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::BigInt(_) => "bigint",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Null => "null",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One result row, columns in `SELECT` order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw access to a column
    ///
    /// # Errors
    ///
    /// Returns `DbError::Parse` if `idx` is out of range.
    pub fn get(&self, idx: usize) -> Result<&Value, DbError> {
        self.values.get(idx).ok_or_else(|| {
            DbError::Parse(format!(
                "column index {idx} out of range (row has {} columns)",
                self.values.len()
            ))
        })
    }

    /// # Errors
    ///
    /// Returns `DbError::Parse` if the column is missing or not a non-null integer.
    pub fn get_i64(&self, idx: usize) -> Result<i64, DbError> {
        match self.get(idx)? {
            Value::BigInt(v) => Ok(*v),
            other => Err(mismatch(idx, "bigint", other)),
        }
    }

    /// Integer column that may be `NULL` (e.g. `MAX(id)` over an empty table)
    ///
    /// # Errors
    ///
    /// Returns `DbError::Parse` if the column is missing or holds a non-integer.
    pub fn get_opt_i64(&self, idx: usize) -> Result<Option<i64>, DbError> {
        match self.get(idx)? {
            Value::BigInt(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            other => Err(mismatch(idx, "bigint", other)),
        }
    }

    /// # Errors
    ///
    /// Returns `DbError::Parse` if the column is missing or not text.
    pub fn get_string(&self, idx: usize) -> Result<String, DbError> {
        match self.get(idx)? {
            Value::Text(v) => Ok(v.clone()),
            other => Err(mismatch(idx, "text", other)),
        }
    }

    /// # Errors
    ///
    /// Returns `DbError::Parse` if the column is missing or not a non-null timestamp.
    pub fn get_timestamp(&self, idx: usize) -> Result<DateTime<Utc>, DbError> {
        match self.get(idx)? {
            Value::Timestamp(v) => Ok(*v),
            other => Err(mismatch(idx, "timestamp", other)),
        }
    }
}

fn mismatch(idx: usize, expected: &str, found: &Value) -> DbError {
    DbError::Parse(format!(
        "column {idx}: expected {expected}, found {}",
        found.type_name()
    ))
}
