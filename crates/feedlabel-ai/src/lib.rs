//! Local AI inference: tokenisation, ONNX Runtime sequence classification
//! and label decoding for feedback text.

mod error;
mod inference;
mod labels;
mod tokenizer;

#[cfg(feature = "onnx")]
mod classifier;

pub use error::{InferenceError, ModelLoadError};
pub use inference::{InferenceService, Prediction, ScoreModel, argmax};
pub use labels::{DEFAULT_LABELS, LabelNames};
pub use tokenizer::{Encoder, Encoding, HfTokenizer};

#[cfg(feature = "onnx")]
pub use classifier::{Device, OnnxClassifier};
#[cfg(feature = "onnx")]
pub use inference::OnnxInference;
