//! Fixed-length tokenisation for the sequence classifier.
//!
//! The classifier consumes exactly `max_length` token ids plus a parallel
//! attention mask. The tokenizer is loaded from a HuggingFace `tokenizer.json`
//! (e.g. `dbmdz/bert-base-turkish-128k-uncased`) and configured once to
//! truncate and right-pad every input to that length.

use std::path::Path;

use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::info;

use crate::{InferenceError, ModelLoadError};

const PAD_TOKEN: &str = "[PAD]";

/// Token ids and attention mask for one input, always `max_length` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    token_ids: Vec<i64>,
    attention_mask: Vec<i64>,
}

impl Encoding {
    /// Build an encoding, rejecting anything that is not exactly `expected` long.
    pub fn new(
        token_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        expected: usize,
    ) -> Result<Self, InferenceError> {
        if token_ids.len() != expected || attention_mask.len() != expected {
            return Err(InferenceError::Shape {
                expected,
                ids: token_ids.len(),
                mask: attention_mask.len(),
            });
        }
        Ok(Self {
            token_ids,
            attention_mask,
        })
    }

    pub fn token_ids(&self) -> &[i64] {
        &self.token_ids
    }

    /// 1 for real tokens, 0 for padding.
    pub fn attention_mask(&self) -> &[i64] {
        &self.attention_mask
    }

    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    /// Number of non-padding positions.
    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

/// Turns normalised text into a fixed-length [`Encoding`].
pub trait Encoder {
    fn encode(&self, text: &str) -> Result<Encoding, InferenceError>;

    fn max_length(&self) -> usize;
}

/// [`Encoder`] backed by a HuggingFace `tokenizers` pipeline.
///
/// Boundary markers (`[CLS]`/`[SEP]` for BERT) come from the tokenizer's own
/// post-processor and count against `max_length`.
pub struct HfTokenizer {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl HfTokenizer {
    /// Load `tokenizer.json` and fix truncation/padding to `max_length`.
    pub fn load(path: &Path, max_length: usize) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::ArtifactMissing(path.to_path_buf()));
        }
        let tokenizer = Tokenizer::from_file(path).map_err(|e| ModelLoadError::Tokenizer {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let loaded = Self::configure(tokenizer, path, max_length)?;
        info!(max_length, tokenizer = %path.display(), "loaded tokenizer");
        Ok(loaded)
    }

    /// Fix truncation and padding on a tokenizer read from `path`.
    fn configure(mut tokenizer: Tokenizer, path: &Path, max_length: usize) -> Result<Self, ModelLoadError> {
        if max_length == 0 {
            return Err(ModelLoadError::ZeroMaxLength {
                path: path.to_path_buf(),
            });
        }

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| ModelLoadError::Tokenizer {
                path: path.to_path_buf(),
                message: format!("set truncation: {e}"),
            })?;

        let pad_id = tokenizer.token_to_id(PAD_TOKEN).unwrap_or(0);
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token: PAD_TOKEN.to_string(),
            ..Default::default()
        }));

        Ok(Self {
            tokenizer,
            max_length,
        })
    }
}

impl Encoder for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Encoding, InferenceError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::Tokenize(e.to_string()))?;

        let token_ids = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();

        Encoding::new(token_ids, attention_mask, self.max_length)
    }

    fn max_length(&self) -> usize {
        self.max_length
    }
}
