//! Human-readable names for classifier output indices.
//!
//! HuggingFace sequence-classification exports carry an `id2label` map in
//! `config.json` next to the model. When that file is absent the two
//! categories the feedback model was trained on are assumed.

use std::collections::HashMap;
use std::path::Path;

use feedlabel_core::Label;
use serde::Deserialize;
use tracing::{info, warn};

use crate::ModelLoadError;

/// Names used when the model directory has no `config.json`.
pub const DEFAULT_LABELS: &[&str] = &["Teknik", "Rehberlik"];

#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Index-ordered label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelNames {
    names: Vec<String>,
}

impl LabelNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn default_set() -> Self {
        Self::new(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect())
    }

    /// Parse the `id2label` map of a HuggingFace `config.json`.
    ///
    /// Keys must be the contiguous indices `0..n`. An empty or missing map
    /// falls back to [`default_set`](Self::default_set).
    pub fn from_config_json(json: &str) -> Result<Self, String> {
        let config: ModelConfig = serde_json::from_str(json).map_err(|e| e.to_string())?;
        if config.id2label.is_empty() {
            return Ok(Self::default_set());
        }

        let mut indexed = Vec::with_capacity(config.id2label.len());
        for (key, name) in config.id2label {
            let idx: usize = key
                .trim()
                .parse()
                .map_err(|_| format!("id2label key '{key}' is not an index"))?;
            indexed.push((idx, name));
        }
        indexed.sort_by_key(|(idx, _)| *idx);

        for (expected, (idx, _)) in indexed.iter().enumerate() {
            if *idx != expected {
                return Err(format!("id2label is missing index {expected}"));
            }
        }
        Ok(Self::new(indexed.into_iter().map(|(_, name)| name).collect()))
    }

    /// Read `config.json` from the model directory if present.
    pub fn load_or_default(model_dir: &Path) -> Result<Self, ModelLoadError> {
        let path = model_dir.join("config.json");
        if !path.exists() {
            warn!(dir = %model_dir.display(), "no config.json, using default label names");
            return Ok(Self::default_set());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ModelLoadError::Labels {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let names = Self::from_config_json(&text).map_err(|message| ModelLoadError::Labels {
            path: path.clone(),
            message,
        })?;
        info!(labels = ?names.names, "loaded label names");
        Ok(names)
    }

    /// Name for `label`, or `LABEL_<i>` when the index is outside the map.
    pub fn name(&self, label: Label) -> String {
        self.names
            .get(label.index())
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{}", label.index()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for LabelNames {
    fn default() -> Self {
        Self::default_set()
    }
}
