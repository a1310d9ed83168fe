//! Backend-neutral connection seam.
//!
//! [`ResilientStore`](crate::ResilientStore) only needs two things from a
//! backend: a way to open a fresh connection, and a connection that runs
//! parameterised SQL. Results come back as Arrow batches.

use arrow::record_batch::RecordBatch;

use crate::StoreError;

/// Rows returned by a query.
pub type RowSet = Vec<RecordBatch>;

/// A bound query parameter. User-supplied values only ever reach SQL as one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Int(i64),
    Text(String),
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// An open connection to the relational store.
pub trait SqlConnection {
    /// Run a statement that returns rows.
    fn query(&mut self, sql: &str, params: &[Param]) -> Result<RowSet, StoreError>;

    /// Run a statement for its side effects, returning the number of rows changed.
    fn execute(&mut self, sql: &str, params: &[Param]) -> Result<usize, StoreError>;
}

/// Opens connections using stored credentials / location.
///
/// Called once at startup and again for every reconnect.
pub trait Connect {
    type Conn: SqlConnection;

    fn connect(&self) -> Result<Self::Conn, StoreError>;

    /// Human-readable target for log lines (never includes secrets).
    fn describe(&self) -> String;
}
