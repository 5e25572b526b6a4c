mod common;

use common::{init, LoadBehavior, StubProvider};
use txcat::{CategoryClassifier, ClassifierConfig, PredictionError, UNKNOWN_CATEGORY};

// The strict API reports why a prediction is missing; the total API hides it
// behind the "unknown" sentinel. Both behaviours are covered here.

#[test]
fn test_strict_api_reports_unavailable_model() {
    init();
    let classifier = CategoryClassifier::new(StubProvider::new().with_behavior(LoadBehavior::FailLoad));
    assert_eq!(classifier.try_predict_top("anything"), Err(PredictionError::ModelUnavailable));
    assert_eq!(classifier.try_predict_ranked("anything", 5), Err(PredictionError::ModelUnavailable));
}

#[test]
fn test_strict_api_reports_no_prediction() {
    init();
    let classifier = CategoryClassifier::new(StubProvider::new().with_output("????", Vec::new()));
    assert_eq!(classifier.try_predict_top("????"), Err(PredictionError::NoPrediction));
    assert_eq!(classifier.try_predict_ranked("????", 3), Err(PredictionError::NoPrediction));
}

#[test]
fn test_all_zero_scores_are_no_prediction() {
    init();
    let classifier = CategoryClassifier::new(
        StubProvider::new().with_output("ZZZZ", vec![("groceries", 1e-9), ("dining", 0.0), ("travel", -0.2)]),
    );
    assert_eq!(classifier.try_predict_top("ZZZZ"), Err(PredictionError::NoPrediction));
    assert_eq!(classifier.try_predict_ranked("ZZZZ", 3), Err(PredictionError::NoPrediction));
    assert_eq!(classifier.predict_top("ZZZZ"), UNKNOWN_CATEGORY);
    assert!(classifier.predict_ranked("ZZZZ", 3).is_empty());
}

#[test]
fn test_strict_api_rejects_zero_k() {
    init();
    let classifier = CategoryClassifier::new(StubProvider::new());
    assert_eq!(classifier.try_predict_ranked("coffee", 0), Err(PredictionError::InvalidTopK));
    assert!(classifier.predict_ranked("coffee", 0).is_empty());
}

#[test]
fn test_strict_and_total_agree_when_loaded() -> Result<(), PredictionError> {
    init();
    let classifier = CategoryClassifier::new(
        StubProvider::new().with_output("Trader Joe's", vec![("groceries", 0.7), ("dining", 0.2), ("groceries", 0.9)]),
    );
    let strict = classifier.try_predict_ranked("Trader Joe's", 2)?;
    assert_eq!(strict, classifier.predict_ranked("Trader Joe's", 2));
    assert_eq!(classifier.try_predict_top("Trader Joe's")?, "groceries");
    Ok(())
}

#[test]
fn test_default_top_k_from_config() {
    init();
    let config = ClassifierConfig::default().with_default_top_k(2);
    let classifier = CategoryClassifier::with_config(StubProvider::new(), config);
    assert_eq!(classifier.predict("coffee shop purchase").len(), 2);
}

#[test]
fn test_zero_epsilon_from_config() {
    init();
    let config = ClassifierConfig::default().with_zero_epsilon(0.2);
    let classifier = CategoryClassifier::with_config(StubProvider::new(), config);
    let result = classifier.predict_ranked("coffee shop purchase", 5);
    assert_eq!(result.probability_of("fees"), Some(0.0));
    assert_eq!(result.probability_of("rent"), Some(0.0));
    assert_eq!(result.probability_of("dining"), Some(0.35));
}
