pub mod config;
pub mod days;
pub mod error;
pub mod normalize;
pub mod record;

pub use config::{AppConfig, DEFAULT_MAX_LENGTH, DevicePreference, ModelConfig};
pub use days::{MAX_DAY_COUNT, parse_day, recent_days};
pub use error::{ConfigError, ValidationError};
pub use normalize::normalize_comment;
pub use record::{Label, NewRecord, Record, RecordFields, REQUIRED_FIELDS};
