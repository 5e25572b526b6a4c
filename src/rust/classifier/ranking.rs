use std::collections::HashMap;

use log::debug;

use super::types::{Hypothesis, PredictionResult};

/// Shapes raw `(category, score)` output into a [`PredictionResult`].
///
/// Model output carries no guarantees: categories may repeat, come in any
/// order, or drift slightly outside `[0, 1]`. `normalize` restores the result
/// invariants:
/// - every probability is finite and within `[0, 1]`, values below
///   `zero_epsilon` collapse to exactly `0.0`
/// - each category appears once, with the highest probability seen for it
/// - hypotheses are sorted by descending probability; ties keep the order in
///   which the categories first appeared in the raw output
/// - at most `k` hypotheses are kept
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingPolicy {
    pub zero_epsilon: f32,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self { zero_epsilon: 1e-6 }
    }
}

impl RankingPolicy {
    pub fn new(zero_epsilon: f32) -> Self {
        Self { zero_epsilon }
    }

    pub fn normalize<I, S>(&self, raw: I, k: usize) -> PredictionResult
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let mut hypotheses: Vec<Hypothesis> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (category, score) in raw {
            let category = category.into();
            let probability = self.clamp(score);
            match positions.get(&category) {
                Some(&idx) => {
                    if probability > hypotheses[idx].probability {
                        hypotheses[idx].probability = probability;
                    }
                }
                None => {
                    positions.insert(category.clone(), hypotheses.len());
                    hypotheses.push(Hypothesis::new(category, probability));
                }
            }
        }

        // Stable sort: equal probabilities keep first-appearance order.
        hypotheses.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hypotheses.truncate(k);

        debug!("Ranked {} hypotheses (k = {})", hypotheses.len(), k);
        PredictionResult::from_hypotheses(hypotheses)
    }

    fn clamp(&self, score: f32) -> f32 {
        if score.is_nan() {
            return 0.0;
        }
        let clamped = score.clamp(0.0, 1.0);
        if clamped < self.zero_epsilon {
            0.0
        } else {
            clamped
        }
    }
}
