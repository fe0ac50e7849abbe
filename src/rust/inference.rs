use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::classifier::{ClassifierError, ProbabilityOutcome, StageModel};
use crate::record::{AlignmentError, FeatureRow, PatientRecord};
use crate::schema::FeatureDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Record does not match the feature descriptor: {0}")]
    RecordMismatch(AlignmentError),
    #[error("{0}")]
    Model(#[from] ClassifierError),
}

/// The predicted label and, when the model offers them, per-class probabilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: String,
    pub probabilities: Option<BTreeMap<String, f64>>,
}

impl PredictionResult {
    /// Probabilities sorted from most to least likely.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .probabilities
            .iter()
            .flatten()
            .map(|(label, p)| (label.as_str(), *p))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked
    }
}

/// Runs one prediction request.
///
/// The label is mandatory: any classifier failure is returned as an error for
/// this request only. Probabilities are best effort and simply omitted when
/// the model cannot provide them.
pub fn infer(
    model: &dyn StageModel,
    descriptor: &FeatureDescriptor,
    record: &PatientRecord,
) -> Result<PredictionResult, PredictionError> {
    let row = FeatureRow::assemble(descriptor, record).map_err(PredictionError::RecordMismatch)?;

    let label = model.predict(&row)?;
    log::info!("Predicted stage: {}", label);

    let probabilities = match model.predict_proba(&row) {
        ProbabilityOutcome::Available(values) => zip_probabilities(model.classes(), values),
        ProbabilityOutcome::Unsupported => {
            log::debug!("Classifier does not estimate probabilities");
            None
        }
        ProbabilityOutcome::Failed(reason) => {
            log::warn!("Probability estimation failed: {}", reason);
            None
        }
    };

    Ok(PredictionResult { label, probabilities })
}

/// Pairs class labels with probabilities by position.
///
/// A length mismatch or a non-finite value means the estimate is unusable.
fn zip_probabilities(classes: &[String], values: Vec<f64>) -> Option<BTreeMap<String, f64>> {
    if classes.len() != values.len() {
        log::warn!(
            "Probability vector has {} entries for {} classes; omitting probabilities",
            values.len(),
            classes.len()
        );
        return None;
    }
    if values.iter().any(|p| !p.is_finite()) {
        log::warn!("Probability vector contains non-finite values; omitting probabilities");
        return None;
    }
    Some(classes.iter().cloned().zip(values).collect())
}
