use std::env;
use std::str::FromStr;

use log::warn;

use crate::classifier::RankingPolicy;

pub const ENV_MAX_DESCRIPTION_CHARS: &str = "TXCAT_MAX_DESCRIPTION_CHARS";
pub const ENV_TOP_K: &str = "TXCAT_TOP_K";
pub const ENV_ZERO_EPSILON: &str = "TXCAT_ZERO_EPSILON";

/// Tunables for a [`CategoryClassifier`](crate::CategoryClassifier).
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Descriptions longer than this many characters are truncated before inference.
    pub max_description_chars: usize,
    /// Number of hypotheses presenters ask for when they have no preference.
    pub default_top_k: usize,
    /// Probabilities below this collapse to exactly zero.
    pub zero_epsilon: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_description_chars: 512,
            default_top_k: 13,
            zero_epsilon: 1e-6,
        }
    }
}

impl ClassifierConfig {
    /// Defaults overridden by `TXCAT_*` environment variables. Values that do
    /// not parse are logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_description_chars: read_env(ENV_MAX_DESCRIPTION_CHARS)
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_description_chars),
            default_top_k: read_env(ENV_TOP_K)
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.default_top_k),
            zero_epsilon: read_env(ENV_ZERO_EPSILON)
                .filter(|e: &f32| e.is_finite() && *e >= 0.0)
                .unwrap_or(defaults.zero_epsilon),
        }
    }

    pub fn with_max_description_chars(mut self, max: usize) -> Self {
        self.max_description_chars = max;
        self
    }

    pub fn with_default_top_k(mut self, k: usize) -> Self {
        self.default_top_k = k;
        self
    }

    pub fn with_zero_epsilon(mut self, epsilon: f32) -> Self {
        self.zero_epsilon = epsilon;
        self
    }

    pub fn ranking_policy(&self) -> RankingPolicy {
        RankingPolicy::new(self.zero_epsilon)
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
