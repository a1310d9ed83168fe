//! JSON responses printed on stdout.
//!
//! Successful commands print their payload; failed requests print a
//! `{"response_code", "response_message"}` envelope.

use std::io::Write;

use feedlabel_ai::Prediction;
use feedlabel_service::ServiceError;
use serde::Serialize;

/// `classify` result: the prediction plus its readable name.
#[derive(Debug, Serialize)]
pub struct Classified {
    #[serde(flatten)]
    pub prediction: Prediction,
    pub label_name: String,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            count: None,
        }
    }

    pub fn labelled(count: usize) -> Self {
        Self {
            message: format!("{count} records labelled"),
            count: Some(count),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub response_code: u16,
    pub response_message: String,
}

impl From<&ServiceError> for Failure {
    fn from(err: &ServiceError) -> Self {
        Self {
            response_code: err.status_code(),
            response_message: err.to_string(),
        }
    }
}

/// Pretty-print `value` as one JSON document on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
