//! Startup configuration shared by every entry point.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::ConfigError;

/// Token budget the classifier was trained with.
pub const DEFAULT_MAX_LENGTH: usize = 50;

/// Where the classifier should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Accelerator when one is available, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    /// Accelerator or nothing: loading fails without one.
    Cuda,
}

impl DevicePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        }
    }
}

impl FromStr for DevicePreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(ConfigError::Invalid {
                setting: "device",
                reason: format!("unknown device '{other}', expected auto, cpu or cuda"),
            }),
        }
    }
}

/// Settings needed to load the classifier.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Directory with `model.onnx`, `tokenizer.json` and optionally `config.json`.
    pub model_dir: PathBuf,
    pub max_length: usize,
    pub device: DevicePreference,
}

impl ModelConfig {
    pub fn new(
        model_dir: Option<PathBuf>,
        max_length: usize,
        device: DevicePreference,
    ) -> Result<Self, ConfigError> {
        let model_dir =
            model_dir.ok_or(ConfigError::Missing("model directory (FEEDLABEL_MODEL_DIR)"))?;
        if max_length == 0 {
            return Err(ConfigError::Invalid {
                setting: "max_length",
                reason: "must be at least 1".into(),
            });
        }
        if !model_dir.is_dir() {
            return Err(ConfigError::ModelDirNotFound(model_dir));
        }
        Ok(Self {
            model_dir,
            max_length,
            device,
        })
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

/// Validated startup configuration.
///
/// Built once in `main`; a value of this type means every required setting
/// was present and the referenced paths exist.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// DuckDB database file holding `sorun_bildir`.
    pub database: PathBuf,
    pub model: ModelConfig,
}

impl AppConfig {
    /// Validate raw settings (typically from flags or environment).
    pub fn new(
        database: Option<PathBuf>,
        model_dir: Option<PathBuf>,
        max_length: usize,
        device: DevicePreference,
    ) -> Result<Self, ConfigError> {
        let database = database.ok_or(ConfigError::Missing("database path (FEEDLABEL_DB)"))?;
        let model = ModelConfig::new(model_dir, max_length, device)?;
        if let Some(parent) = database.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            return Err(ConfigError::DatabaseDirNotFound(parent.to_path_buf()));
        }

        info!(
            database = %database.display(),
            model_dir = %model.model_dir.display(),
            max_length,
            device = device.as_str(),
            "configuration loaded"
        );
        Ok(Self { database, model })
    }

    pub fn database(&self) -> &Path {
        &self.database
    }
}
