use ort::Error as OrtError;
use std::fmt;

/// Represents the different types of errors that can occur while loading or running
/// a category model.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// The model artifact is missing, corrupt, or incompatible with the runtime
    ModelLoadFailure(String),
    /// The artifact loaded but cannot be adapted to the classification interface
    ConversionFailure(String),
    /// Error occurred while loading or using the tokenizer
    TokenizerError(String),
    /// Error occurred while running the model
    ModelError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
}

impl ClassifierError {
    /// Whether this error happened while loading the artifact, as opposed to
    /// while serving a prediction.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::ModelLoadFailure(_) | Self::ConversionFailure(_))
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoadFailure(msg) => write!(f, "Model load failure: {}", msg),
            Self::ConversionFailure(msg) => write!(f, "Model conversion failure: {}", msg),
            Self::TokenizerError(msg) => write!(f, "Tokenizer error: {}", msg),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelLoadFailure(err.to_string())
    }
}

/// Errors surfaced by the strict prediction API of
/// [`CategoryClassifier`](super::CategoryClassifier).
///
/// The total API (`predict_top` / `predict_ranked`) maps every one of these to
/// the `"unknown"` sentinel instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("Category model is unavailable")]
    ModelUnavailable,
    #[error("Model produced no prediction for the input")]
    NoPrediction,
    #[error("Requested hypothesis count must be positive")]
    InvalidTopK,
    #[error("Inference failed: {0}")]
    Inference(#[from] ClassifierError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failure_kinds() {
        assert!(ClassifierError::ModelLoadFailure("missing".into()).is_load_failure());
        assert!(ClassifierError::ConversionFailure("labels".into()).is_load_failure());
        assert!(!ClassifierError::ModelError("run".into()).is_load_failure());
    }

    #[test]
    fn test_display() {
        let err = ClassifierError::ConversionFailure("no id2label".into());
        assert_eq!(err.to_string(), "Model conversion failure: no id2label");

        let err: PredictionError = ClassifierError::ModelError("boom".into()).into();
        assert_eq!(err.to_string(), "Inference failed: Model error: boom");
    }
}
