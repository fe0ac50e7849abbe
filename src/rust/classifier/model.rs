use std::sync::Arc;

use ndarray::Array2;
use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor};

use super::error::ClassifierError;
use super::{ClassifierInfo, ProbabilityOutcome, StageModel};
use crate::record::{FeatureRow, FeatureValue};

/// Element type a model input expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputKind {
    Text,
    Float32,
    Float64,
    Int64,
}

#[derive(Debug, Clone)]
pub(crate) struct ModelInput {
    pub name: String,
    pub kind: InputKind,
}

/// A stage classifier backed by an ONNX graph with one named input per feature.
///
/// # Thread Safety
///
/// The session and metadata sit behind `Arc` and are never mutated after
/// `build()`, so one instance can serve every caller:
///
/// ```rust,no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use stageview::{OnnxStageModel, StageModel};
/// use std::sync::Arc;
///
/// let model = Arc::new(OnnxStageModel::builder()
///     .with_model_path("model.onnx")
///     .with_class_labels(vec!["1", "2", "3"])
///     .build()?);
///
/// let shared = Arc::clone(&model);
/// std::thread::spawn(move || shared.info());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OnnxStageModel {
    pub model_path: String,
    pub session: Arc<Session>,
    pub(crate) inputs: Arc<Vec<ModelInput>>,
    pub class_labels: Arc<Vec<String>>,
    pub label_output: String,
    pub probability_output: Option<String>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxStageModel>();
    }
};

impl OnnxStageModel {
    /// Creates a new OnnxStageModelBuilder for fluent construction
    pub fn builder() -> super::builder::OnnxStageModelBuilder {
        super::builder::OnnxStageModelBuilder::new()
    }

    /// Builds one `[1, 1]` tensor per model input, looked up by name in the row.
    fn bind_inputs(&self, row: &FeatureRow) -> Result<Vec<(String, SessionInputValue<'static>)>, ClassifierError> {
        let mut bound = Vec::with_capacity(self.inputs.len());
        for input in self.inputs.iter() {
            let value = row.get(&input.name).ok_or_else(|| ClassifierError::InputError {
                input: input.name.clone(),
                reason: "no value in the feature row".into(),
            })?;

            let tensor: SessionInputValue<'static> = match input.kind {
                InputKind::Text => Tensor::<String>::from_string_array(Array2::from_elem((1, 1), value.to_text()))
                    .map_err(tensor_error)?
                    .into(),
                InputKind::Float32 => {
                    let number = numeric_value(&input.name, value)? as f32;
                    Tensor::from_array(Array2::from_elem((1, 1), number)).map_err(tensor_error)?.into()
                }
                InputKind::Float64 => {
                    let number = numeric_value(&input.name, value)?;
                    Tensor::from_array(Array2::from_elem((1, 1), number)).map_err(tensor_error)?.into()
                }
                InputKind::Int64 => {
                    let number = numeric_value(&input.name, value)?;
                    if number.fract() != 0.0 {
                        return Err(ClassifierError::InputError {
                            input: input.name.clone(),
                            reason: format!("expects an integer, got {}", number),
                        });
                    }
                    Tensor::from_array(Array2::from_elem((1, 1), number as i64)).map_err(tensor_error)?.into()
                }
            };
            bound.push((input.name.clone(), tensor));
        }
        Ok(bound)
    }

    fn first_label(value: &DynValue) -> Result<String, ClassifierError> {
        if let Ok(labels) = value.try_extract_string_tensor() {
            return labels.iter().next().cloned()
                .ok_or_else(|| ClassifierError::ModelError("Label output is empty".into()));
        }
        if let Ok(labels) = value.try_extract_tensor::<i64>() {
            return labels.iter().next().map(|l| l.to_string())
                .ok_or_else(|| ClassifierError::ModelError("Label output is empty".into()));
        }
        Err(ClassifierError::ModelError(
            "Label output is neither a string nor an int64 tensor".into(),
        ))
    }
}

impl StageModel for OnnxStageModel {
    fn predict(&self, row: &FeatureRow) -> Result<String, ClassifierError> {
        let inputs = self.bind_inputs(row)?;
        let outputs = self.session.run(inputs)
            .map_err(|e| ClassifierError::PredictionError(format!("Failed to run model: {}", e)))?;
        let label = outputs.get(self.label_output.as_str()).ok_or_else(|| {
            ClassifierError::ModelError(format!("Model produced no '{}' output", self.label_output))
        })?;
        Self::first_label(label)
    }

    fn predict_proba(&self, row: &FeatureRow) -> ProbabilityOutcome {
        let Some(output_name) = self.probability_output.as_deref() else {
            return ProbabilityOutcome::Unsupported;
        };

        let inputs = match self.bind_inputs(row) {
            Ok(inputs) => inputs,
            Err(e) => return ProbabilityOutcome::Failed(e.to_string()),
        };
        let outputs = match self.session.run(inputs) {
            Ok(outputs) => outputs,
            Err(e) => return ProbabilityOutcome::Failed(format!("Failed to run model: {}", e)),
        };
        let Some(value) = outputs.get(output_name) else {
            return ProbabilityOutcome::Failed(format!("Model produced no '{}' output", output_name));
        };

        // A ZipMap output (sequence of maps) lands here too; export with zipmap disabled.
        match value.try_extract_tensor::<f32>() {
            Ok(probabilities) => ProbabilityOutcome::Available(probabilities.iter().map(|&p| f64::from(p)).collect()),
            Err(e) => ProbabilityOutcome::Failed(format!("Failed to extract probabilities: {}", e)),
        }
    }

    fn classes(&self) -> &[String] {
        &self.class_labels
    }

    fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            backend: "onnx".to_string(),
            model_path: Some(self.model_path.clone()),
            class_labels: self.class_labels.as_ref().clone(),
            input_names: self.inputs.iter().map(|i| i.name.clone()).collect(),
            supports_probabilities: self.probability_output.is_some(),
        }
    }
}

fn numeric_value(name: &str, value: &FeatureValue) -> Result<f64, ClassifierError> {
    value.as_f64().ok_or_else(|| ClassifierError::InputError {
        input: name.to_string(),
        reason: format!("expects a number, got '{}'", value),
    })
}

fn tensor_error(e: ort::Error) -> ClassifierError {
    ClassifierError::ModelError(format!("Failed to create input tensor: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_value_parses_text() {
        assert_eq!(numeric_value("Age", &FeatureValue::from("45")).unwrap(), 45.0);
        assert_eq!(numeric_value("Age", &FeatureValue::Number(1.5)).unwrap(), 1.5);
    }

    #[test]
    fn test_numeric_value_rejects_words() {
        let err = numeric_value("Age", &FeatureValue::from("old")).unwrap_err();
        assert!(matches!(err, ClassifierError::InputError { .. }));
        assert!(err.to_string().contains("Age"));
    }
}
