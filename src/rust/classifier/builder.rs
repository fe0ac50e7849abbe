use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::ValueType;

use super::error::ClassifierError;
use super::model::{InputKind, ModelInput, OnnxStageModel};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Default output names of a scikit-learn classifier exported to ONNX.
pub const DEFAULT_LABEL_OUTPUT: &str = "output_label";
pub const DEFAULT_PROBABILITY_OUTPUT: &str = "output_probability";

/// Custom metadata key that may carry the class labels.
pub const CLASSES_METADATA_KEY: &str = "classes";

/// A builder for constructing an OnnxStageModel with a fluent interface.
#[derive(Debug)]
pub struct OnnxStageModelBuilder {
    model_path: Option<String>,
    class_labels: Option<Vec<String>>,
    feature_columns: Option<Vec<String>>,
    label_output: String,
    probability_output: String,
    runtime_config: RuntimeConfig,
}

impl Default for OnnxStageModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OnnxStageModelBuilder {
    /// Creates a new builder using the scikit-learn export output names
    ///
    /// # Example
    /// ```
    /// use stageview::OnnxStageModelBuilder;
    ///
    /// let builder = OnnxStageModelBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            model_path: None,
            class_labels: None,
            feature_columns: None,
            label_output: DEFAULT_LABEL_OUTPUT.to_string(),
            probability_output: DEFAULT_PROBABILITY_OUTPUT.to_string(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration for ONNX model execution
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the path of the serialized ONNX model
    pub fn with_model_path(mut self, path: impl AsRef<Path>) -> Self {
        self.model_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Sets the class labels explicitly.
    ///
    /// Without this, labels are read from the model's `classes` metadata entry.
    pub fn with_class_labels(mut self, labels: Vec<impl Into<String>>) -> Self {
        self.class_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Declares the feature columns records will carry.
    ///
    /// When set, `build()` fails if the model has an input that no column feeds.
    pub fn with_feature_columns(mut self, columns: &[String]) -> Self {
        self.feature_columns = Some(columns.to_vec());
        self
    }

    pub fn with_label_output(mut self, name: impl Into<String>) -> Self {
        self.label_output = name.into();
        self
    }

    pub fn with_probability_output(mut self, name: impl Into<String>) -> Self {
        self.probability_output = name.into();
        self
    }

    /// Validates class labels:
    /// - No label may be empty
    /// - Labels must be unique
    fn validate_class_labels(labels: &[String]) -> Result<(), ClassifierError> {
        if let Some(pos) = labels.iter().position(|l| l.is_empty()) {
            return Err(ClassifierError::ValidationError(
                format!("Class label {} cannot be empty", pos + 1)
            ));
        }
        let mut seen = HashSet::new();
        for label in labels {
            if !seen.insert(label) {
                return Err(ClassifierError::ValidationError(
                    format!("Duplicate class label '{}'", label)
                ));
            }
        }
        Ok(())
    }

    /// Builds and returns the final OnnxStageModel instance
    ///
    /// # Returns
    /// * `Result<OnnxStageModel, ClassifierError>` - The constructed model if successful, or an error if:
    ///   - No model path is set or the file does not exist
    ///   - The ONNX session cannot be created from the file
    ///   - The model lacks the label output or has an unsupported input type
    ///   - A model input has no matching feature column
    ///   - The class labels are invalid
    pub fn build(self) -> Result<OnnxStageModel, ClassifierError> {
        let model_path = self.model_path.clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ClassifierError::BuildError("Model path must be set".to_string()))?;
        if !Path::new(&model_path).exists() {
            return Err(ClassifierError::BuildError(format!("Model file not found: {}", model_path)));
        }

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(&model_path)
            .map_err(|e| {
                error!("Failed to load model: {}", e);
                ClassifierError::BuildError(format!("Failed to load model: {}", e))
            })?;

        let inputs = Self::validate_model(&session, &self.label_output)?;
        info!("Model structure validated successfully ({} inputs)", inputs.len());

        if let Some(columns) = &self.feature_columns {
            let unfed: Vec<&str> = inputs.iter()
                .filter(|input| !columns.contains(&input.name))
                .map(|input| input.name.as_str())
                .collect();
            if !unfed.is_empty() {
                return Err(ClassifierError::ValidationError(format!(
                    "Model input(s) without a feature column: {}",
                    unfed.join(", ")
                )));
            }
        }

        let class_labels = match self.class_labels.clone() {
            Some(labels) => labels,
            None => Self::labels_from_metadata(&session),
        };
        Self::validate_class_labels(&class_labels)?;

        let has_probability_output = session.outputs.iter().any(|o| o.name == self.probability_output);
        let probability_output = match (has_probability_output, class_labels.is_empty()) {
            (true, false) => Some(self.probability_output.clone()),
            (true, true) => {
                warn!("Model has a '{}' output but no class labels; probabilities disabled", self.probability_output);
                None
            }
            (false, _) => {
                info!("Model has no '{}' output; probabilities unavailable", self.probability_output);
                None
            }
        };

        Ok(OnnxStageModel {
            model_path,
            session: Arc::new(session),
            inputs: Arc::new(inputs),
            class_labels: Arc::new(class_labels),
            label_output: self.label_output,
            probability_output,
        })
    }

    /// Reads labels from the `classes` metadata entry: a JSON list or a comma-separated string.
    fn labels_from_metadata(session: &Session) -> Vec<String> {
        let raw = match session.metadata().and_then(|m| m.custom(CLASSES_METADATA_KEY)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Could not read model metadata: {}", e);
                return Vec::new();
            }
        };
        parse_class_list(&raw)
    }

    /// Validates that the model has the expected input/output structure
    ///
    /// # Returns
    /// * The model inputs with their element types, or an error if:
    ///   - The model has no inputs
    ///   - An input is not a tensor of string, float or int64 elements
    ///   - The label output is missing
    fn validate_model(session: &Session, label_output: &str) -> Result<Vec<ModelInput>, ClassifierError> {
        if session.inputs.is_empty() {
            return Err(ClassifierError::ModelError("Model must have at least 1 input".to_string()));
        }

        let mut inputs = Vec::with_capacity(session.inputs.len());
        for input in &session.inputs {
            let kind = match &input.input_type {
                ValueType::Tensor { ty, .. } => match ty {
                    TensorElementType::String => InputKind::Text,
                    TensorElementType::Float32 => InputKind::Float32,
                    TensorElementType::Float64 => InputKind::Float64,
                    TensorElementType::Int64 => InputKind::Int64,
                    other => {
                        return Err(ClassifierError::ModelError(format!(
                            "Input '{}' has unsupported element type {:?}",
                            input.name, other
                        )))
                    }
                },
                other => {
                    return Err(ClassifierError::ModelError(format!(
                        "Input '{}' must be a tensor, found {:?}",
                        input.name, other
                    )))
                }
            };
            inputs.push(ModelInput { name: input.name.clone(), kind });
        }

        if !session.outputs.iter().any(|o| o.name == label_output) {
            return Err(ClassifierError::ModelError(
                format!("Model must have a '{}' output", label_output)
            ));
        }

        Ok(inputs)
    }
}

pub(crate) fn parse_class_list(raw: &str) -> Vec<String> {
    if let Ok(labels) = serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        return labels.into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class_list_json() {
        assert_eq!(parse_class_list(r#"["C", "CL", "D"]"#), vec!["C", "CL", "D"]);
        assert_eq!(parse_class_list("[1, 2, 3]"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_parse_class_list_comma_separated() {
        assert_eq!(parse_class_list("Stage_1, Stage_2,Stage_3"), vec!["Stage_1", "Stage_2", "Stage_3"]);
        assert!(parse_class_list("").is_empty());
    }

    #[test]
    fn test_class_label_validation() {
        let ok: Vec<String> = vec!["1".into(), "2".into()];
        assert!(OnnxStageModelBuilder::validate_class_labels(&ok).is_ok());

        let empty: Vec<String> = vec!["1".into(), "".into()];
        assert!(matches!(
            OnnxStageModelBuilder::validate_class_labels(&empty),
            Err(ClassifierError::ValidationError(_))
        ));

        let dup: Vec<String> = vec!["1".into(), "1".into()];
        assert!(OnnxStageModelBuilder::validate_class_labels(&dup).is_err());
    }

    #[test]
    fn test_build_requires_model_path() {
        let result = OnnxStageModelBuilder::new().build();
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_build_missing_file() {
        let result = OnnxStageModelBuilder::new()
            .with_model_path("/nonexistent/stageview/model.onnx")
            .build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Model file not found"));
    }

    #[test]
    fn test_build_rejects_corrupt_model() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"not an onnx graph")?;

        let result = OnnxStageModelBuilder::new().with_model_path(&path).build();
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
        Ok(())
    }
}
