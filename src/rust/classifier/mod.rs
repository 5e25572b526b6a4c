mod error;
mod encoder;
mod model;
mod provider;
mod ranking;
mod types;
#[allow(clippy::module_inception)]
mod classifier;
mod utils;

pub use error::{ClassifierError, PredictionError};
pub use model::{OnnxCategoryModel, OnnxModelProvider, CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};
pub use provider::{CategoryModel, ModelProvider};
pub use ranking::RankingPolicy;
pub use types::{ClassifierState, Hypothesis, PredictionResult, UNKNOWN_CATEGORY};
pub use classifier::CategoryClassifier;

use crate::config::ClassifierConfig;

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Lifecycle state of the owned model
    pub state: ClassifierState,
    /// Number of categories in the loaded vocabulary (0 unless loaded)
    pub num_categories: usize,
    /// The vocabulary in the model's native order
    pub categories: Vec<String>,
    /// Where the model comes from
    pub provider: String,
    /// Active configuration
    pub config: ClassifierConfig,
}
