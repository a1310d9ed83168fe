//! ONNX Runtime sequence classifier.
//!
//! Runs a BERT-style `*ForSequenceClassification` export: token ids and
//! attention mask in, one row of logits `[1, num_labels]` out.

use std::path::Path;
use std::sync::Mutex;

use feedlabel_core::DevicePreference;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::value::Tensor;
use tracing::{info, warn};

use crate::{Encoding, InferenceError, ModelLoadError, ScoreModel};

/// Where the session ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda(i32),
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(id) => write!(f, "cuda:{id}"),
        }
    }
}

/// Sequence classifier backed by an ONNX Runtime session.
///
/// The session is only read, but `Session::run` takes `&mut self`, so it
/// sits behind a mutex.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    device: Device,
    uses_token_type_ids: bool,
}

impl OnnxClassifier {
    /// Load `model.onnx` and place it according to `preference`.
    pub fn load(model_path: &Path, preference: DevicePreference) -> Result<Self, ModelLoadError> {
        if !model_path.exists() {
            return Err(ModelLoadError::ArtifactMissing(model_path.to_path_buf()));
        }
        let session_err = |e: String| ModelLoadError::Session {
            path: model_path.to_path_buf(),
            message: e,
        };

        let builder = Session::builder().map_err(|e| session_err(e.to_string()))?;
        let (builder, device) = place(builder, preference).map_err(|e| match e {
            PlaceError::Unavailable(device) => ModelLoadError::DeviceUnavailable {
                device,
                path: model_path.to_path_buf(),
            },
            PlaceError::Runtime(msg) => session_err(msg),
        })?;
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| session_err(e.to_string()))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();
        for required in ["input_ids", "attention_mask"] {
            if !input_names.iter().any(|n| n == required) {
                return Err(session_err(format!(
                    "model has no '{required}' input (inputs: {input_names:?})"
                )));
            }
        }
        let uses_token_type_ids = input_names.iter().any(|n| n == "token_type_ids");

        info!(
            %device,
            token_type_ids = uses_token_type_ids,
            model = %model_path.display(),
            "loaded classification model"
        );
        Ok(Self {
            session: Mutex::new(session),
            device,
            uses_token_type_ids,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

impl ScoreModel for OnnxClassifier {
    fn forward(&self, encoding: &Encoding) -> Result<Vec<f32>, InferenceError> {
        let seq_len = encoding.len();
        let shape = [1i64, seq_len as i64];
        let runtime = |e: ort::Error| InferenceError::Runtime(e.to_string());

        let ids = Tensor::from_array((shape, encoding.token_ids().to_vec().into_boxed_slice()))
            .map_err(runtime)?;
        let mask = Tensor::from_array((shape, encoding.attention_mask().to_vec().into_boxed_slice()))
            .map_err(runtime)?;

        let mut session = self.session.lock().map_err(|_| InferenceError::Poisoned)?;
        let outputs = if self.uses_token_type_ids {
            let types = Tensor::from_array((shape, vec![0i64; seq_len].into_boxed_slice()))
                .map_err(runtime)?;
            session.run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
                "token_type_ids" => types,
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
            ])
        }
        .map_err(runtime)?;

        let (output_shape, logits) = outputs[0].try_extract_tensor::<f32>().map_err(runtime)?;
        let dims: &[i64] = output_shape;
        if dims.len() != 2 || dims[0] != 1 || dims[1] <= 0 {
            return Err(InferenceError::Output(format!(
                "logits shape {dims:?}, expected [1, num_labels]"
            )));
        }
        Ok(logits.to_vec())
    }
}

enum PlaceError {
    Unavailable(&'static str),
    Runtime(String),
}

#[cfg(feature = "cuda")]
fn place(
    builder: SessionBuilder,
    preference: DevicePreference,
) -> Result<(SessionBuilder, Device), PlaceError> {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

    if preference == DevicePreference::Cpu {
        return Ok((builder, Device::Cpu));
    }

    let cuda = CUDAExecutionProvider::default().with_device_id(0);
    let available = cuda.is_available().unwrap_or(false);
    if !available {
        if preference == DevicePreference::Cuda {
            return Err(PlaceError::Unavailable("cuda"));
        }
        warn!("CUDA not available, running on CPU");
        return Ok((builder, Device::Cpu));
    }

    let builder = builder
        .with_execution_providers([cuda.build()])
        .map_err(|e| PlaceError::Runtime(e.to_string()))?;
    Ok((builder, Device::Cuda(0)))
}

#[cfg(not(feature = "cuda"))]
fn place(
    builder: SessionBuilder,
    preference: DevicePreference,
) -> Result<(SessionBuilder, Device), PlaceError> {
    match preference {
        DevicePreference::Cuda => Err(PlaceError::Unavailable("cuda")),
        DevicePreference::Auto => {
            warn!("built without CUDA support, running on CPU");
            Ok((builder, Device::Cpu))
        }
        DevicePreference::Cpu => Ok((builder, Device::Cpu)),
    }
}
