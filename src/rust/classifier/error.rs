use ort::Error as OrtError;
use std::fmt;

/// Errors raised while building or querying a stage classifier.
#[derive(Debug)]
pub enum ClassifierError {
    /// The graph lacks the label output, has a non-tensor or unsupported
    /// input, returned an empty label, or the ONNX environment failed to start
    ModelError(String),
    /// A feature value could not be bound to the model input of the same name:
    /// absent from the row, text where a number is expected, or a fraction
    /// for an int64 input
    InputError { input: String, reason: String },
    /// The model file is missing or unreadable, or no session could be created from it
    BuildError(String),
    /// Running the graph on a patient row failed, e.g. an encoder met an unseen category
    PredictionError(String),
    /// Class labels or feature columns do not fit the model
    ValidationError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::InputError { input, reason } => write!(f, "Input '{}': {}", input, reason),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::BuildError(err.to_string())
    }
}
