use super::error::ClassifierError;

/// A loaded classification artifact.
///
/// `classify` returns raw `(category, score)` pairs. Implementations make no
/// promise about order, uniqueness, or range of the scores; the ranking
/// policy takes care of that. They must however be deterministic: the same
/// text always yields the same output.
pub trait CategoryModel: Send + Sync {
    fn classify(&self, text: &str) -> Result<Vec<(String, f32)>, ClassifierError>;

    /// The model's vocabulary in its native order.
    fn categories(&self) -> Vec<String>;
}

/// Supplies a [`CategoryModel`] from some opaque artifact (a file, a cache
/// entry, an embedded resource).
///
/// `load` is called at most once per classifier lifecycle and should report
/// `ClassifierError::ModelLoadFailure` when the artifact cannot be read and
/// `ClassifierError::ConversionFailure` when it cannot be adapted into a
/// classifier.
pub trait ModelProvider: Send + Sync {
    type Model: CategoryModel;

    fn load(&self) -> Result<Self::Model, ClassifierError>;

    /// Short human readable description used in logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
