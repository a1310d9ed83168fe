//! Turning command-line input into validated request values.

use std::io::Read;
use std::path::Path;

use feedlabel_core::{MAX_DAY_COUNT, RecordFields, ValidationError};
use tracing::warn;

/// Read record fields as JSON from a file, or from stdin when `source` is `-`.
pub fn read_fields(source: &str) -> Result<RecordFields, ValidationError> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| ValidationError::Malformed(format!("reading stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(Path::new(source))
            .map_err(|e| ValidationError::Malformed(format!("reading {source}: {e}")))?
    };
    parse_fields(&text)
}

pub fn parse_fields(text: &str) -> Result<RecordFields, ValidationError> {
    serde_json::from_str(text).map_err(|e| {
        warn!(error = %e, "unparseable record body");
        ValidationError::Malformed(e.to_string())
    })
}

/// Day counts come from the user and must lie in `1..=MAX_DAY_COUNT`.
pub fn day_count(days: i64) -> Result<u32, ValidationError> {
    if days < 1 {
        return Err(ValidationError::InvalidDayCount(days));
    }
    u32::try_from(days)
        .ok()
        .filter(|&n| n <= MAX_DAY_COUNT)
        .ok_or(ValidationError::DayCountTooLarge {
            got: days,
            max: MAX_DAY_COUNT,
        })
}
