//! Text in, label out.

use feedlabel_core::{Label, normalize_comment};
use serde::Serialize;
use tracing::debug;

use crate::{Encoder, Encoding, InferenceError, LabelNames};

/// A forward pass from a fixed-length encoding to one score per class.
pub trait ScoreModel {
    fn forward(&self, encoding: &Encoding) -> Result<Vec<f32>, InferenceError>;
}

/// Index of the highest score. The first maximum wins ties; NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<Label> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| Label(i))
}

/// Normalised comment with its predicted label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub comment: String,
    pub label: Label,
}

/// Normaliser, tokenizer, model and label names composed into one call.
///
/// Built once at startup and shared by reference; it holds no per-request
/// state and caches nothing.
pub struct InferenceService<E, M> {
    encoder: E,
    model: M,
    labels: LabelNames,
}

impl<E: Encoder, M: ScoreModel> InferenceService<E, M> {
    pub fn new(encoder: E, model: M, labels: LabelNames) -> Self {
        Self {
            encoder,
            model,
            labels,
        }
    }

    /// Classify raw, untrusted text.
    pub fn classify(&self, raw_text: &str) -> Result<Label, InferenceError> {
        Ok(self.prediction(raw_text)?.label)
    }

    /// Classify and also return the normalised text the model saw.
    pub fn prediction(&self, raw_text: &str) -> Result<Prediction, InferenceError> {
        let comment = normalize_comment(raw_text);
        let encoding = self.encoder.encode(&comment)?;
        let scores = self.model.forward(&encoding)?;
        let label = argmax(&scores).ok_or(InferenceError::EmptyScores)?;
        debug!(label = label.index(), tokens = encoding.real_tokens(), "classified");
        Ok(Prediction { comment, label })
    }

    pub fn label_name(&self, label: Label) -> String {
        self.labels.name(label)
    }

    pub fn labels(&self) -> &LabelNames {
        &self.labels
    }

    pub fn max_length(&self) -> usize {
        self.encoder.max_length()
    }
}

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;

    use feedlabel_core::DevicePreference;
    use tracing::info;

    use super::InferenceService;
    use crate::{HfTokenizer, LabelNames, ModelLoadError, OnnxClassifier};

    /// The production pipeline: HuggingFace tokenizer plus ONNX Runtime model.
    pub type OnnxInference = InferenceService<HfTokenizer, OnnxClassifier>;

    impl InferenceService<HfTokenizer, OnnxClassifier> {
        /// Load every artifact from `model_dir`.
        ///
        /// The directory must hold `model.onnx` and `tokenizer.json`;
        /// `config.json` is optional and only supplies label names.
        pub fn load(
            model_dir: &Path,
            max_length: usize,
            device: DevicePreference,
        ) -> Result<Self, ModelLoadError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            for path in [&model_path, &tokenizer_path] {
                if !path.exists() {
                    return Err(ModelLoadError::ArtifactMissing(path.clone()));
                }
            }

            let encoder = HfTokenizer::load(&tokenizer_path, max_length)?;
            let model = OnnxClassifier::load(&model_path, device)?;
            let labels = LabelNames::load_or_default(model_dir)?;

            info!(
                device = %model.device(),
                labels = labels.len(),
                max_length,
                "inference service ready"
            );
            Ok(Self::new(encoder, model, labels))
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxInference;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::HfTokenizer;
    use crate::tokenizer::tests::write_test_tokenizer;
    use std::cell::{Cell, RefCell};

    /// Scores each class by how many of its keyword ids appear in the input.
    pub(crate) struct KeywordModel {
        pub classes: Vec<Vec<i64>>,
        pub seen: RefCell<Vec<Vec<i64>>>,
    }

    impl KeywordModel {
        /// Class 0 fires on "teknik"/"sorun", class 1 on "rehberlik"/"desteğe".
        pub(crate) fn feedback() -> Self {
            Self {
                classes: vec![vec![5, 6], vec![8, 9]],
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl ScoreModel for KeywordModel {
        fn forward(&self, encoding: &Encoding) -> Result<Vec<f32>, InferenceError> {
            self.seen.borrow_mut().push(encoding.token_ids().to_vec());
            Ok(self
                .classes
                .iter()
                .map(|kw| {
                    encoding
                        .token_ids()
                        .iter()
                        .filter(|id| kw.contains(id))
                        .count() as f32
                })
                .collect())
        }
    }

    struct FixedModel(Vec<f32>);

    impl ScoreModel for FixedModel {
        fn forward(&self, _: &Encoding) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    struct FailingModel;

    impl ScoreModel for FailingModel {
        fn forward(&self, _: &Encoding) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError::Runtime("device lost".into()))
        }
    }

    /// Fails the first `failures` calls, then scores class 1 highest.
    struct FlakyModel {
        failures: Cell<usize>,
    }

    impl ScoreModel for FlakyModel {
        fn forward(&self, _: &Encoding) -> Result<Vec<f32>, InferenceError> {
            let left = self.failures.get();
            if left > 0 {
                self.failures.set(left - 1);
                return Err(InferenceError::Runtime("device lost".into()));
            }
            Ok(vec![0.2, 0.8])
        }
    }

    pub(crate) fn tokenizer(dir: &std::path::Path) -> HfTokenizer {
        HfTokenizer::load(&write_test_tokenizer(dir), 50).unwrap()
    }

    fn service<M: ScoreModel>(
        model: M,
    ) -> (tempfile::TempDir, InferenceService<HfTokenizer, M>) {
        let tmp = tempfile::TempDir::new().unwrap();
        let svc = InferenceService::new(tokenizer(tmp.path()), model, LabelNames::default());
        (tmp, svc)
    }

    #[test]
    fn argmax_basics() {
        assert_eq!(argmax(&[0.1, 0.9]), Some(Label(1)));
        assert_eq!(argmax(&[2.0, -1.0, 0.5]), Some(Label(0)));
        assert_eq!(argmax(&[-3.0, -2.0]), Some(Label(1)));
    }

    #[test]
    fn argmax_tie_goes_to_lowest_index() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(Label(0)));
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.7]), Some(Label(1)));
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.2]), Some(Label(1)));
        assert_eq!(argmax(&[0.2, f32::NAN, 0.3]), Some(Label(2)));
        assert_eq!(argmax(&[f32::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn scenario_uygulamada_teknik_sorun() {
        let (_tmp, svc) = service(KeywordModel::feedback());
        let pred = svc.prediction("Uygulamada teknik sorun var!!! 123").unwrap();
        assert_eq!(pred.comment, "uygulamada teknik sorun var ");
        assert_eq!(pred.label, Label(0));
        assert_eq!(svc.label_name(pred.label), "Teknik");
    }

    #[test]
    fn model_sees_normalised_fixed_length_input() {
        let (_tmp, svc) = service(KeywordModel::feedback());
        svc.classify("REHBERLIK!!! desteğe 42 ihtiyacım var.").unwrap();
        let seen = svc.model.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 50);
        assert_eq!(&seen[0][..6], &[2, 8, 9, 10, 7, 3]);
        assert!(seen[0][6..].iter().all(|&id| id == 0));
    }

    #[test]
    fn classify_is_deterministic() {
        let (_tmp, svc) = service(KeywordModel::feedback());
        let text = "Rehberlik desteğe ihtiyacım var";
        let first = svc.classify(text).unwrap();
        for _ in 0..5 {
            assert_eq!(svc.classify(text).unwrap(), first);
        }
        assert_eq!(first, Label(1));
    }

    #[test]
    fn tie_returns_first_label() {
        let (_tmp, svc) = service(FixedModel(vec![1.0, 1.0]));
        assert_eq!(svc.classify("anything").unwrap(), Label(0));
    }

    #[test]
    fn empty_scores_is_error() {
        let (_tmp, svc) = service(FixedModel(vec![]));
        assert!(matches!(
            svc.classify("x"),
            Err(InferenceError::EmptyScores)
        ));
    }

    #[test]
    fn model_error_propagates() {
        let (_tmp, svc) = service(FailingModel);
        assert!(matches!(svc.classify("x"), Err(InferenceError::Runtime(_))));
    }

    #[test]
    fn failed_request_does_not_affect_the_next() {
        let (_tmp, svc) = service(FlakyModel {
            failures: Cell::new(1),
        });
        assert!(matches!(
            svc.classify("video açılmıyor"),
            Err(InferenceError::Runtime(_))
        ));
        assert_eq!(svc.classify("video açılmıyor").unwrap(), Label(1));
        assert_eq!(svc.prediction("rehberlik").unwrap().label, Label(1));
    }

    #[test]
    fn empty_text_still_classifies() {
        let (_tmp, svc) = service(KeywordModel::feedback());
        assert_eq!(svc.classify("").unwrap(), Label(0));
        assert_eq!(svc.classify("!!! 123").unwrap(), Label(0));
    }

    #[test]
    fn prediction_serialises_label_as_integer() {
        let pred = Prediction {
            comment: "video açılmıyor".into(),
            label: Label(1),
        };
        let json = serde_json::to_value(&pred).unwrap();
        assert_eq!(json, serde_json::json!({"comment": "video açılmıyor", "label": 1}));
    }
}
