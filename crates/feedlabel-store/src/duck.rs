//! DuckDB backend for the feedback store.

use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use duckdb::types::Value;
use duckdb::{Connection, ErrorCode, params_from_iter};

use crate::{Connect, Param, RowSet, SqlConnection, StoreError};

/// Opens DuckDB connections to a fixed location.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Reconnecting to an in-memory database yields a new, empty database, so
/// production use wants [`file`](Self::file).
#[derive(Debug, Clone)]
pub struct DuckConnector {
    path: Option<PathBuf>,
}

impl DuckConnector {
    /// Connector for a persistent database at `path` (created on first open).
    pub fn file(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    /// Connector for an in-memory database.
    pub fn in_memory() -> Self {
        Self { path: None }
    }
}

impl Connect for DuckConnector {
    type Conn = DuckConnection;

    fn connect(&self) -> Result<DuckConnection, StoreError> {
        let conn = match &self.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(DuckConnection { conn })
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("duckdb:{}", path.display()),
            None => "duckdb::memory:".to_string(),
        }
    }
}

/// A live DuckDB connection.
pub struct DuckConnection {
    conn: Connection,
}

impl DuckConnection {
    /// Access the underlying DuckDB connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SqlConnection for DuckConnection {
    fn query(&mut self, sql: &str, params: &[Param]) -> Result<RowSet, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt
            .query_arrow(params_from_iter(to_values(params)))?
            .collect();
        Ok(batches)
    }

    fn execute(&mut self, sql: &str, params: &[Param]) -> Result<usize, StoreError> {
        let changed = self.conn.execute(sql, params_from_iter(to_values(params)))?;
        Ok(changed)
    }
}

fn to_values(params: &[Param]) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p {
            Param::Null => Value::Null,
            Param::Int(v) => Value::BigInt(*v),
            Param::Text(v) => Value::Text(v.clone()),
        })
        .collect()
}

/// Whether a DuckDB error means the connection (or database) is unusable,
/// as opposed to the statement being wrong.
pub(crate) fn is_connection_failure(err: &duckdb::Error) -> bool {
    if let duckdb::Error::DuckDBFailure(ffi_err, _) = err
        && matches!(
            ffi_err.code,
            ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::NotADatabase
                | ErrorCode::OperationInterrupted
        )
    {
        return true;
    }
    // After a fatal error DuckDB refuses every further statement on the
    // same database instance until it is reopened.
    let msg = err.to_string();
    msg.contains("database has been invalidated") || msg.contains("Connection already closed")
}
