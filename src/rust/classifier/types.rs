use serde::Serialize;

/// Reserved category returned whenever no real prediction can be made.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// A single (category, probability) pair produced for one description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hypothesis {
    pub category: String,
    /// Always within `[0.0, 1.0]` once it has passed through the ranking policy.
    pub probability: f32,
}

impl Hypothesis {
    pub fn new(category: impl Into<String>, probability: f32) -> Self {
        Self {
            category: category.into(),
            probability,
        }
    }
}

impl From<(String, f32)> for Hypothesis {
    fn from((category, probability): (String, f32)) -> Self {
        Self { category, probability }
    }
}

impl From<(&str, f32)> for Hypothesis {
    fn from((category, probability): (&str, f32)) -> Self {
        Self::new(category, probability)
    }
}

/// Ranked hypotheses for one description, most confident first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub hypotheses: Vec<Hypothesis>,
    /// The first hypothesis' category, or [`UNKNOWN_CATEGORY`] when there is none.
    pub top_label: String,
}

impl PredictionResult {
    pub(crate) fn from_hypotheses(hypotheses: Vec<Hypothesis>) -> Self {
        let top_label = hypotheses
            .first()
            .map(|h| h.category.clone())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
        Self { hypotheses, top_label }
    }

    /// The degraded result: no hypotheses and the sentinel label.
    pub fn unknown() -> Self {
        Self {
            hypotheses: Vec::new(),
            top_label: UNKNOWN_CATEGORY.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    /// Probability assigned to `category`, if it is part of the result.
    pub fn probability_of(&self, category: &str) -> Option<f32> {
        self.hypotheses
            .iter()
            .find(|h| h.category == category)
            .map(|h| h.probability)
    }

    /// Hypotheses as plain `(category, probability)` pairs.
    pub fn pairs(&self) -> Vec<(&str, f32)> {
        self.hypotheses
            .iter()
            .map(|h| (h.category.as_str(), h.probability))
            .collect()
    }
}

/// Lifecycle of the model owned by a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassifierState {
    /// No load has been attempted yet.
    Unloaded,
    /// The model is loaded and serving predictions.
    Loaded,
    /// Loading failed; predictions degrade to the sentinel until reinitialized.
    Unavailable,
}
