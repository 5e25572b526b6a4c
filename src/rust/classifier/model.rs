use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use ort::session::Session;
use serde::Deserialize;
use tokenizers::Tokenizer;

use super::encoder::{validate_session, TextEncoder};
use super::error::ClassifierError;
use super::provider::{CategoryModel, ModelProvider};
use super::utils::softmax;
use crate::runtime::{create_session_builder, RuntimeConfig};

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";

const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 256;

/// The parts of a Hugging Face style `config.json` the provider needs.
#[derive(Debug, Deserialize)]
struct ModelConfigFile {
    #[serde(default)]
    id2label: BTreeMap<String, String>,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
}

/// Loads a sequence-classification ONNX model (text in, one logit per
/// category out) together with its tokenizer and label map.
///
/// A model directory is expected to contain `model.onnx`, `tokenizer.json`
/// and a `config.json` with an `id2label` map, the layout produced by
/// exporting a fine-tuned transformer classifier.
#[derive(Debug, Clone)]
pub struct OnnxModelProvider {
    model_path: PathBuf,
    tokenizer_path: PathBuf,
    config_path: PathBuf,
    max_sequence_length: Option<usize>,
    runtime_config: RuntimeConfig,
}

impl OnnxModelProvider {
    pub fn new(
        model_path: impl Into<PathBuf>,
        tokenizer_path: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
            config_path: config_path.into(),
            max_sequence_length: None,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Provider for the standard file layout inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(MODEL_FILE), dir.join(TOKENIZER_FILE), dir.join(CONFIG_FILE))
    }

    /// Overrides the sequence length taken from `config.json`.
    pub fn with_max_sequence_length(mut self, max_sequence_length: usize) -> Self {
        self.max_sequence_length = Some(max_sequence_length);
        self
    }

    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn require_file(path: &Path, what: &str) -> Result<(), ClassifierError> {
        if !path.is_file() {
            return Err(ClassifierError::ModelLoadFailure(
                format!("{} file not found: {}", what, path.display())
            ));
        }
        Ok(())
    }
}

impl ModelProvider for OnnxModelProvider {
    type Model = OnnxCategoryModel;

    fn load(&self) -> Result<OnnxCategoryModel, ClassifierError> {
        Self::require_file(&self.model_path, "Model")?;
        Self::require_file(&self.tokenizer_path, "Tokenizer")?;
        Self::require_file(&self.config_path, "Config")?;

        let tokenizer = Tokenizer::from_file(&self.tokenizer_path)
            .map_err(|e| {
                error!("Failed to load tokenizer: {}", e);
                ClassifierError::ModelLoadFailure(format!("Failed to load tokenizer: {}", e))
            })?;
        info!("Tokenizer loaded successfully");

        let raw_config = fs::read_to_string(&self.config_path)
            .map_err(|e| ClassifierError::ModelLoadFailure(format!("Failed to read config: {}", e)))?;
        let (labels, config_max_length) = parse_label_config(&raw_config)?;
        info!("Label map loaded with {} categories", labels.len());

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(&self.model_path)?;
        validate_session(&session)?;
        info!("Model structure validated successfully");

        let model = OnnxCategoryModel {
            tokenizer: Arc::new(tokenizer),
            session: Arc::new(session),
            labels: Arc::new(labels),
            max_sequence_length: self
                .max_sequence_length
                .or(config_max_length)
                .unwrap_or(DEFAULT_MAX_SEQUENCE_LENGTH),
        };

        // Probe once so a head/label mismatch surfaces at load time, not per prediction.
        let width = model
            .logits("")
            .map_err(|e| ClassifierError::ConversionFailure(format!("Probe inference failed: {}", e)))?
            .len();
        if width != model.labels.len() {
            return Err(ClassifierError::ConversionFailure(format!(
                "Model produces {} logits but the label map has {} categories",
                width,
                model.labels.len()
            )));
        }

        Ok(model)
    }

    fn describe(&self) -> String {
        format!("onnx:{}", self.model_path.display())
    }
}

/// Parses `id2label` into labels ordered by id, plus the optional max sequence length.
fn parse_label_config(raw: &str) -> Result<(Vec<String>, Option<usize>), ClassifierError> {
    let config: ModelConfigFile = serde_json::from_str(raw)
        .map_err(|e| ClassifierError::ConversionFailure(format!("Invalid config.json: {}", e)))?;

    if config.id2label.is_empty() {
        return Err(ClassifierError::ConversionFailure("config.json has no id2label map".into()));
    }

    let mut by_id: BTreeMap<usize, String> = BTreeMap::new();
    for (id, label) in config.id2label {
        let id: usize = id.trim().parse()
            .map_err(|_| ClassifierError::ConversionFailure(format!("Label id {:?} is not an integer", id)))?;
        by_id.insert(id, label);
    }

    let mut seen = HashSet::new();
    let mut labels = Vec::with_capacity(by_id.len());
    for (expected, (id, label)) in by_id.into_iter().enumerate() {
        if id != expected {
            return Err(ClassifierError::ConversionFailure(format!("Label id {} is missing", expected)));
        }
        if label.is_empty() || !seen.insert(label.clone()) {
            return Err(ClassifierError::ConversionFailure(format!("Invalid or duplicate label {:?}", label)));
        }
        labels.push(label);
    }

    Ok((labels, config.max_position_embeddings))
}

/// A loaded sequence-classification model. Probabilities are the softmax of
/// the logits, reported in label-id order.
#[derive(Debug)]
pub struct OnnxCategoryModel {
    tokenizer: Arc<Tokenizer>,
    session: Arc<Session>,
    labels: Arc<Vec<String>>,
    max_sequence_length: usize,
}

impl TextEncoder for OnnxCategoryModel {
    fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }
}

impl CategoryModel for OnnxCategoryModel {
    fn classify(&self, text: &str) -> Result<Vec<(String, f32)>, ClassifierError> {
        let logits = self.logits(text)?;
        if logits.len() != self.labels.len() {
            return Err(ClassifierError::ModelError(format!(
                "Expected {} logits, got {}",
                self.labels.len(),
                logits.len()
            )));
        }
        let probabilities = softmax(&logits, 1.0);
        Ok(self.labels.iter().cloned().zip(probabilities).collect())
    }

    fn categories(&self) -> Vec<String> {
        self.labels.as_ref().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_in_id_order() {
        let raw = r#"{
            "id2label": {"2": "travel", "0": "groceries", "1": "dining", "10": "fees",
                         "3": "rent", "4": "a", "5": "b", "6": "c", "7": "d", "8": "e", "9": "f"},
            "max_position_embeddings": 512
        }"#;
        let (labels, max_len) = parse_label_config(raw).unwrap();
        assert_eq!(&labels[..4], &["groceries", "dining", "travel", "rent"]);
        assert_eq!(labels[10], "fees");
        assert_eq!(max_len, Some(512));
    }

    #[test]
    fn test_label_config_conversion_failures() {
        let cases = [
            "not json",
            r#"{"hidden_size": 384}"#,
            r#"{"id2label": {"0": "a", "2": "b"}}"#,
            r#"{"id2label": {"0": "a", "1": "a"}}"#,
            r#"{"id2label": {"zero": "a"}}"#,
            r#"{"id2label": {"0": ""}}"#,
        ];
        for raw in cases {
            let err = parse_label_config(raw).unwrap_err();
            assert!(matches!(err, ClassifierError::ConversionFailure(_)), "{}: {:?}", raw, err);
        }
    }

    #[test]
    fn test_missing_files_are_load_failures() {
        let provider = OnnxModelProvider::from_dir("/nonexistent/txcat-model");
        let err = provider.load().unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoadFailure(_)));
        assert!(provider.describe().ends_with("model.onnx"));
    }

    #[test]
    fn test_corrupt_artifact_is_load_failure() {
        let dir = std::env::temp_dir().join(format!("txcat-corrupt-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MODEL_FILE), "corrupted data").unwrap();
        fs::write(dir.join(TOKENIZER_FILE), "{}").unwrap();
        fs::write(dir.join(CONFIG_FILE), r#"{"id2label": {"0": "a"}}"#).unwrap();

        let err = OnnxModelProvider::from_dir(&dir).load().unwrap_err();
        assert!(err.is_load_failure(), "{:?}", err);
        let _ = fs::remove_dir_all(&dir);
    }
}
