use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

use log::{debug, error, info, warn};

use super::error::PredictionError;
use super::provider::{CategoryModel, ModelProvider};
use super::ranking::RankingPolicy;
use super::types::{ClassifierState, PredictionResult};
use super::utils::truncate_chars;
use crate::config::ClassifierConfig;

enum LoadOutcome<M> {
    Ready(M),
    /// Reason kept for `Debug` output only.
    Failed(String),
}

/// Predicts transaction categories for free-text descriptions.
///
/// The classifier owns exactly one model, obtained from its [`ModelProvider`]
/// the first time it is needed (or on an explicit [`initialize`](Self::initialize)).
/// Loading happens at most once: concurrent first callers wait for the single
/// load to finish, and a failed load leaves the classifier
/// [`Unavailable`](ClassifierState::Unavailable) until
/// [`reinitialize`](Self::reinitialize) is called.
///
/// Two prediction surfaces are offered:
/// - `predict_top` / `predict_ranked` are total. They never fail; when no
///   prediction can be made they return the `"unknown"` sentinel and an
///   empty hypothesis list.
/// - `try_predict_top` / `try_predict_ranked` report why there is no
///   prediction through [`PredictionError`].
///
/// # Thread Safety
///
/// After loading, the model is only ever read, so a classifier can be shared
/// across threads with `Arc` whenever its provider and model are `Send + Sync`
/// (which the traits require).
///
/// ```rust
/// use std::sync::Arc;
/// use txcat::{CategoryClassifier, CategoryModel, ClassifierError, ModelProvider};
///
/// struct Keywords;
///
/// impl CategoryModel for Keywords {
///     fn classify(&self, text: &str) -> Result<Vec<(String, f32)>, ClassifierError> {
///         let coffee = if text.contains("coffee") { 0.9 } else { 0.1 };
///         Ok(vec![("dining".into(), coffee), ("groceries".into(), 1.0 - coffee)])
///     }
///
///     fn categories(&self) -> Vec<String> {
///         vec!["dining".into(), "groceries".into()]
///     }
/// }
///
/// struct KeywordProvider;
///
/// impl ModelProvider for KeywordProvider {
///     type Model = Keywords;
///
///     fn load(&self) -> Result<Keywords, ClassifierError> {
///         Ok(Keywords)
///     }
/// }
///
/// let classifier = Arc::new(CategoryClassifier::new(KeywordProvider));
/// let worker = {
///     let classifier = Arc::clone(&classifier);
///     std::thread::spawn(move || classifier.predict_top("coffee shop purchase"))
/// };
/// assert_eq!(worker.join().unwrap(), "dining");
/// ```
pub struct CategoryClassifier<P: ModelProvider> {
    provider: P,
    config: ClassifierConfig,
    policy: RankingPolicy,
    slot: OnceLock<LoadOutcome<P::Model>>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<CategoryClassifier<super::model::OnnxModelProvider>>();
    }
};

impl<P: ModelProvider> CategoryClassifier<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, ClassifierConfig::default())
    }

    pub fn with_config(provider: P, config: ClassifierConfig) -> Self {
        let policy = config.ranking_policy();
        Self {
            provider,
            config,
            policy,
            slot: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Loads the model if no load has been attempted yet and returns the
    /// resulting state. Never retries after a failure.
    pub fn initialize(&self) -> ClassifierState {
        Self::state_of(self.slot.get_or_init(|| self.load()))
    }

    /// Discards the loaded model (or the recorded failure) and loads again.
    pub fn reinitialize(&mut self) -> ClassifierState {
        info!("Reinitializing classifier for {}", self.provider.describe());
        self.slot = OnceLock::new();
        self.initialize()
    }

    /// Current lifecycle state, without triggering a load.
    pub fn state(&self) -> ClassifierState {
        match self.slot.get() {
            None => ClassifierState::Unloaded,
            Some(outcome) => Self::state_of(outcome),
        }
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        let categories = match self.slot.get() {
            Some(LoadOutcome::Ready(model)) => model.categories(),
            _ => Vec::new(),
        };
        super::ClassifierInfo {
            state: self.state(),
            num_categories: categories.len(),
            categories,
            provider: self.provider.describe(),
            config: self.config.clone(),
        }
    }

    /// The single most probable category, or `"unknown"`.
    pub fn predict_top(&self, description: &str) -> String {
        self.predict_ranked(description, 1).top_label
    }

    /// Up to `k` hypotheses, most probable first. Degrades to an empty result
    /// labelled `"unknown"`.
    pub fn predict_ranked(&self, description: &str, k: usize) -> PredictionResult {
        match self.try_predict_ranked(description, k) {
            Ok(result) => result,
            Err(PredictionError::Inference(e)) => {
                warn!("Prediction failed, returning unknown: {}", e);
                PredictionResult::unknown()
            }
            Err(e) => {
                debug!("No prediction, returning unknown: {}", e);
                PredictionResult::unknown()
            }
        }
    }

    /// `predict_ranked` with the configured default hypothesis count.
    pub fn predict(&self, description: &str) -> PredictionResult {
        self.predict_ranked(description, self.config.default_top_k)
    }

    pub fn try_predict_top(&self, description: &str) -> Result<String, PredictionError> {
        self.try_predict_ranked(description, 1).map(|result| result.top_label)
    }

    pub fn try_predict_ranked(
        &self,
        description: &str,
        k: usize,
    ) -> Result<PredictionResult, PredictionError> {
        if k == 0 {
            return Err(PredictionError::InvalidTopK);
        }
        let model = self.model()?;

        let text = truncate_chars(description, self.config.max_description_chars);
        if text.len() < description.len() {
            warn!(
                "Description truncated to {} characters before classification",
                self.config.max_description_chars
            );
        }

        let raw = model.classify(text)?;
        let result = self.policy.normalize(raw, k);
        // A ranking whose best probability collapsed to zero carries no prediction.
        if result.hypotheses.first().map_or(true, |top| top.probability <= 0.0) {
            return Err(PredictionError::NoPrediction);
        }
        debug!("Classified {:?} as {}", text, result.top_label);
        Ok(result)
    }

    fn model(&self) -> Result<&P::Model, PredictionError> {
        match self.slot.get_or_init(|| self.load()) {
            LoadOutcome::Ready(model) => Ok(model),
            LoadOutcome::Failed(_) => Err(PredictionError::ModelUnavailable),
        }
    }

    fn load(&self) -> LoadOutcome<P::Model> {
        let source = self.provider.describe();
        info!("Loading category model from {}", source);
        let start = Instant::now();
        match self.provider.load() {
            Ok(model) => {
                info!(
                    "Category model loaded ({} categories, took {:.2?})",
                    model.categories().len(),
                    start.elapsed()
                );
                LoadOutcome::Ready(model)
            }
            Err(e) => {
                error!("Category model unavailable, predictions will be 'unknown': {}", e);
                LoadOutcome::Failed(e.to_string())
            }
        }
    }

    fn state_of(outcome: &LoadOutcome<P::Model>) -> ClassifierState {
        match outcome {
            LoadOutcome::Ready(_) => ClassifierState::Loaded,
            LoadOutcome::Failed(_) => ClassifierState::Unavailable,
        }
    }
}

impl<P: ModelProvider> fmt::Debug for CategoryClassifier<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("CategoryClassifier");
        debug
            .field("provider", &self.provider.describe())
            .field("state", &self.state())
            .field("config", &self.config);
        if let Some(LoadOutcome::Failed(reason)) = self.slot.get() {
            debug.field("failure", reason);
        }
        debug.finish()
    }
}
