use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The connection itself is unusable (dropped, reset, database unreachable).
    /// Recoverable by reconnecting.
    #[error("connection error: {0}")]
    Connection(String),

    /// The statement was rejected: bad SQL, constraint violation, type mismatch.
    /// Reconnecting would not help.
    #[error("query error: {0}")]
    Query(String),

    /// One reconnect and one retry were made and the operation still failed.
    #[error("store unavailable after reconnect: {0}")]
    RetryFailed(Box<StoreError>),

    /// The connection dropped while running a statement that is never
    /// replayed, so whether it was applied is unknown.
    #[error("connection lost, statement may not have been applied: {0}")]
    Unconfirmed(Box<StoreError>),

    /// A result set did not have the expected shape.
    #[error("unexpected result: {0}")]
    Decode(String),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Whether the failure is a lost or broken connection rather than a
    /// problem with the statement.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[cfg(feature = "duckdb")]
impl From<::duckdb::Error> for StoreError {
    fn from(err: ::duckdb::Error) -> Self {
        if crate::duck::is_connection_failure(&err) {
            Self::Connection(err.to_string())
        } else {
            Self::Query(err.to_string())
        }
    }
}
