//! Session traits
//!
//! The broker talks to the shared SQL server through two small traits:
//! a [`SessionFactory`] that hands out administrative sessions and the
//! [`SqlSession`] itself, an opaque execute/query interface.
//!
//! Sessions are scoped: every broker call opens one, uses it, and lets it
//! drop. Implementations must return the underlying connection to its pool
//! (or close it) in `Drop`, so that early returns through `?` release the
//! session just like the success path does.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{BackendError, BackendResult};

/// A single column value in a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Integral column (`INTEGER`, `BIGINT`, `COUNT(*)`).
    Integer(i64),
    /// Exact numeric column (`DECIMAL`, large `SUM`s).
    Decimal(Decimal),
    /// Character column.
    Text(String),
}

impl SqlValue {
    /// Integer view of the value.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok(),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Exact numeric view of the value.
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SqlValue::Integer(v) => Some(Decimal::from(*v)),
            SqlValue::Decimal(d) => Some(*d),
            SqlValue::Text(s) => Decimal::from_str(s.trim()).ok(),
            SqlValue::Null => None,
        }
    }

    /// Text view of the value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// One row of a result set, columns in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Vec<SqlValue>);

impl Row {
    #[must_use]
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.0.get(index)
    }

    /// Read a non-null text column.
    pub fn text(&self, index: usize) -> BackendResult<&str> {
        self.get(index)
            .and_then(SqlValue::as_str)
            .ok_or_else(|| BackendError::unexpected_result("row", format!("column {index} is not text")))
    }

    /// Read a numeric column. NULL reads as zero, which is what an empty
    /// `SUM` means for storage accounting.
    pub fn decimal(&self, index: usize) -> BackendResult<Decimal> {
        match self.get(index) {
            Some(SqlValue::Null) => Ok(Decimal::ZERO),
            Some(value) => value.as_decimal().ok_or_else(|| {
                BackendError::unexpected_result("row", format!("column {index} is not numeric"))
            }),
            None => Err(BackendError::unexpected_result(
                "row",
                format!("missing column {index}"),
            )),
        }
    }
}

impl From<Vec<SqlValue>> for Row {
    fn from(values: Vec<SqlValue>) -> Self {
        Self(values)
    }
}

/// An open administrative session on the shared SQL server.
#[async_trait]
pub trait SqlSession: Send {
    /// Execute a statement that returns no rows (DDL, GRANT, REVOKE).
    async fn execute(&mut self, sql: &str) -> BackendResult<()>;

    /// Run a query and return all rows.
    async fn query(&mut self, sql: &str) -> BackendResult<Vec<Row>>;

    /// Run a single-value `COUNT(*)` query.
    async fn query_count(&mut self, sql: &str) -> BackendResult<i64> {
        let rows = self.query(sql).await?;
        rows.first()
            .and_then(|row| row.get(0))
            .and_then(SqlValue::as_i64)
            .ok_or_else(|| BackendError::unexpected_result("count query", "no integer in first column"))
    }
}

/// Source of administrative sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Acquire a session. The caller owns it until it is dropped.
    async fn open(&self) -> BackendResult<Box<dyn SqlSession>>;
}
