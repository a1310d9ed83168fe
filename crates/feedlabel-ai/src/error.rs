use std::path::PathBuf;

use thiserror::Error;

/// The classifier could not be brought up. Fatal at startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model artifact not found: {0}")]
    ArtifactMissing(PathBuf),

    #[error("failed to load tokenizer {path}: {message}")]
    Tokenizer { path: PathBuf, message: String },

    #[error("failed to load model {path}: {message}")]
    Session { path: PathBuf, message: String },

    #[error("failed to read label map {path}: {message}")]
    Labels { path: PathBuf, message: String },

    #[error("requested device '{device}' is not available for model {path}")]
    DeviceUnavailable { device: &'static str, path: PathBuf },

    #[error("max length must be at least 1 for tokenizer {path}")]
    ZeroMaxLength { path: PathBuf },
}

/// A single classification request failed. Other requests are unaffected.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("tokenization failed: {0}")]
    Tokenize(String),

    #[error("encoding has {ids} ids and {mask} mask positions, expected {expected}")]
    Shape {
        expected: usize,
        ids: usize,
        mask: usize,
    },

    #[error("inference runtime error: {0}")]
    Runtime(String),

    #[error("unexpected model output: {0}")]
    Output(String),

    #[error("model returned no usable scores")]
    EmptyScores,

    #[error("model session lock poisoned")]
    Poisoned,
}
