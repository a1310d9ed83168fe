use std::path::PathBuf;

use thiserror::Error;

/// Malformed or incomplete input rejected at the request boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("invalid date '{0}', expected YYYY-MM-DD (e.g. 2019-10-01)")]
    InvalidDate(String),

    #[error("day count must be at least 1, got {0}")]
    InvalidDayCount(i64),

    #[error("day count must be at most {max}, got {got}")]
    DayCountTooLarge { got: i64, max: u32 },

    #[error("malformed request body: {0}")]
    Malformed(String),
}

/// Missing or invalid startup configuration. Fatal: nothing is served.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting not provided: {0}")]
    Missing(&'static str),

    #[error("model directory not found: {0}")]
    ModelDirNotFound(PathBuf),

    #[error("database directory does not exist: {0}")]
    DatabaseDirNotFound(PathBuf),

    #[error("invalid value for {setting}: {reason}")]
    Invalid {
        setting: &'static str,
        reason: String,
    },
}
