//! Storage layer: resilient relational access (DuckDB) for feedback records.

mod connection;
mod error;
mod resilient;
pub mod records;

pub use connection::{Connect, Param, RowSet, SqlConnection};
pub use error::StoreError;
pub use resilient::ResilientStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::{DuckConnection, DuckConnector};
