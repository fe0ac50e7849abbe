use crate::record::FeatureRow;

mod error;
mod model;
pub mod builder;

pub use error::ClassifierError;
pub use model::OnnxStageModel;
pub use builder::OnnxStageModelBuilder;

/// Outcome of asking a model for class probabilities.
///
/// Probability estimation is optional: a model may not offer it at all, or
/// the attempt may fail. Neither case invalidates the predicted label.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbabilityOutcome {
    /// One probability per class, in the order of [`StageModel::classes`].
    Available(Vec<f64>),
    /// The model has no probability capability.
    Unsupported,
    /// The model offers probabilities but the call failed.
    Failed(String),
}

impl ProbabilityOutcome {
    pub fn into_available(self) -> Option<Vec<f64>> {
        match self {
            ProbabilityOutcome::Available(p) => Some(p),
            _ => None,
        }
    }
}

/// A trained classifier consumed at inference time.
///
/// Implementations are loaded once and shared read-only, so they must be
/// safe to call from any number of threads.
pub trait StageModel: Send + Sync {
    /// Predicts the label for a single row.
    fn predict(&self, row: &FeatureRow) -> Result<String, ClassifierError>;

    /// Estimates per-class probabilities for a single row.
    fn predict_proba(&self, _row: &FeatureRow) -> ProbabilityOutcome {
        ProbabilityOutcome::Unsupported
    }

    /// Class labels matching the positions of the probability vector.
    fn classes(&self) -> &[String];

    fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            backend: "custom".to_string(),
            model_path: None,
            class_labels: self.classes().to_vec(),
            input_names: Vec::new(),
            supports_probabilities: false,
        }
    }
}

/// Information about a loaded classifier, for logging and display.
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Short backend name
    pub backend: String,
    /// Path to the model file, if file-backed
    pub model_path: Option<String>,
    /// Labels of the classes
    pub class_labels: Vec<String>,
    /// Names of the model's inputs
    pub input_names: Vec<String>,
    /// Whether the model exposes a probability output
    pub supports_probabilities: bool,
}
