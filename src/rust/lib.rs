//! Transaction category prediction.
//!
//! Given a short free-text transaction description ("TRADER JOE'S #552",
//! "Uber trip 09/14"), predict the most likely spending category together with
//! a ranked list of alternatives and their probabilities.
//!
//! The crate is built around two pieces:
//! - [`CategoryClassifier`] owns one model obtained from a [`ModelProvider`],
//!   loads it once, and serves predictions. Load failures never escape: the
//!   classifier becomes unavailable and answers `"unknown"`.
//! - [`RankingPolicy`] turns raw model scores into a clean ranking: unique
//!   categories, probabilities clamped into `[0, 1]`, stable descending order.
//!
//! [`OnnxModelProvider`] loads an exported, pre-trained sequence-classification
//! model (ONNX graph, tokenizer and label map) from a directory.
//!
//! # Basic Usage
//!
//! ```rust
//! use txcat::{CategoryClassifier, CategoryModel, ClassifierError, ModelProvider};
//!
//! struct Merchants;
//!
//! impl CategoryModel for Merchants {
//!     fn classify(&self, text: &str) -> Result<Vec<(String, f32)>, ClassifierError> {
//!         let groceries = if text.contains("Trader Joe") { 0.9 } else { 0.2 };
//!         Ok(vec![
//!             ("groceries".to_string(), groceries),
//!             ("dining".to_string(), 1.0 - groceries),
//!         ])
//!     }
//!
//!     fn categories(&self) -> Vec<String> {
//!         vec!["groceries".to_string(), "dining".to_string()]
//!     }
//! }
//!
//! struct MerchantProvider;
//!
//! impl ModelProvider for MerchantProvider {
//!     type Model = Merchants;
//!
//!     fn load(&self) -> Result<Merchants, ClassifierError> {
//!         Ok(Merchants)
//!     }
//! }
//!
//! let classifier = CategoryClassifier::new(MerchantProvider);
//! assert_eq!(classifier.predict_top("Trader Joe's"), "groceries");
//!
//! let ranked = classifier.predict_ranked("Trader Joe's", 2);
//! assert_eq!(ranked.top_label, "groceries");
//! assert_eq!(ranked.hypotheses.len(), 2);
//! ```
//!
//! # Using an exported model
//!
//! ```no_run
//! use txcat::{CategoryClassifier, OnnxModelProvider};
//!
//! // model.onnx, tokenizer.json and config.json (with id2label)
//! let classifier = CategoryClassifier::new(OnnxModelProvider::from_dir("models/txn-minilm"));
//! let result = classifier.predict_ranked("coffee shop purchase", 3);
//! for hypothesis in &result.hypotheses {
//!     println!("{}: {:.1}%", hypothesis.category, hypothesis.probability * 100.0);
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod display;
pub mod ffi;
pub mod model_manager;
mod runtime;

pub use classifier::{
    CategoryClassifier, CategoryModel, ClassifierError, ClassifierInfo, ClassifierState,
    Hypothesis, ModelProvider, OnnxCategoryModel, OnnxModelProvider, PredictionError,
    PredictionResult, RankingPolicy, UNKNOWN_CATEGORY,
};
pub use config::ClassifierConfig;
pub use display::{DisplayStore, DisplayStoreError, FileDisplayStore, MemoryDisplayStore, RefreshHandle, Timeline, TimelineEntry};
pub use model_manager::{ModelError, ModelInfo, ModelManager};
pub use runtime::{create_session_builder, RuntimeConfig};

pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
