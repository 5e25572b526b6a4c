#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use env_logger::{Builder, Env};
use txcat::{CategoryModel, ClassifierError, ModelProvider};

// Initialize test logger
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Returns canned raw output per description, with a fallback for anything else.
#[derive(Clone)]
pub struct StubModel {
    outputs: HashMap<String, Vec<(String, f32)>>,
    fallback: Vec<(String, f32)>,
    vocabulary: Vec<String>,
}

impl CategoryModel for StubModel {
    fn classify(&self, text: &str) -> Result<Vec<(String, f32)>, ClassifierError> {
        Ok(self.outputs.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
    }

    fn categories(&self) -> Vec<String> {
        self.vocabulary.clone()
    }
}

pub enum LoadBehavior {
    Succeed,
    FailLoad,
    FailConversion,
}

/// Provider that counts how often it is asked to load.
pub struct StubProvider {
    model: StubModel,
    behavior: LoadBehavior,
    load_delay: Duration,
    pub loads: Arc<AtomicUsize>,
}

impl StubProvider {
    pub fn new() -> Self {
        let vocabulary = ["groceries", "dining", "travel", "fees", "rent"];
        Self {
            model: StubModel {
                outputs: HashMap::new(),
                fallback: vec![
                    ("dining".to_string(), 0.35),
                    ("groceries".to_string(), 0.25),
                    ("travel".to_string(), 0.25),
                    ("fees".to_string(), 0.1),
                    ("rent".to_string(), 0.05),
                ],
                vocabulary: vocabulary.iter().map(|c| c.to_string()).collect(),
            },
            behavior: LoadBehavior::Succeed,
            load_delay: Duration::ZERO,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_output(mut self, text: &str, raw: Vec<(&str, f32)>) -> Self {
        self.model.outputs.insert(
            text.to_string(),
            raw.into_iter().map(|(c, p)| (c.to_string(), p)).collect(),
        );
        self
    }

    pub fn with_behavior(mut self, behavior: LoadBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelProvider for StubProvider {
    type Model = StubModel;

    fn load(&self) -> Result<StubModel, ClassifierError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            thread::sleep(self.load_delay);
        }
        match self.behavior {
            LoadBehavior::Succeed => Ok(self.model.clone()),
            LoadBehavior::FailLoad => Err(ClassifierError::ModelLoadFailure("artifact missing".into())),
            LoadBehavior::FailConversion => Err(ClassifierError::ConversionFailure("no label map".into())),
        }
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}
