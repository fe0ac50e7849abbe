#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use stageview::{ClassifierError, FeatureDescriptor, FeatureRow, FeatureValue, ProbabilityOutcome, StageModel};

pub fn liver_descriptor() -> FeatureDescriptor {
    FeatureDescriptor {
        feature_columns: vec!["Age".into(), "Bilirubin".into(), "Sex".into()],
        categorical_columns: vec!["Sex".into()],
        numeric_columns: vec!["Age".into(), "Bilirubin".into()],
        class_labels: None,
    }
}

pub const LIVER_DESCRIPTOR_JSON: &str = r#"{
    "feature_columns": ["Age", "Bilirubin", "Sex"],
    "categorical_columns": ["Sex"],
    "numeric_columns": ["Age", "Bilirubin"]
}"#;

/// How the stub answers probability requests.
#[derive(Debug, Clone)]
pub enum ProbaMode {
    Returns(Vec<f64>),
    Unsupported,
    Fails,
}

/// A classifier that returns a fixed label and records the rows it saw.
pub struct StubModel {
    pub label: String,
    pub classes: Vec<String>,
    pub proba: ProbaMode,
    /// Rejects rows whose `Sex` is not listed, like an encoder meeting an unseen category.
    pub known_sex: Option<Vec<String>>,
    pub calls: AtomicUsize,
    pub seen_columns: Mutex<Vec<Vec<String>>>,
}

impl StubModel {
    pub fn new(label: &str, proba: ProbaMode) -> Self {
        Self {
            label: label.to_string(),
            classes: vec!["Stage_1".into(), "Stage_2".into(), "Stage_3".into()],
            proba,
            known_sex: None,
            calls: AtomicUsize::new(0),
            seen_columns: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting_unknown_sex(mut self, known: &[&str]) -> Self {
        self.known_sex = Some(known.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StageModel for StubModel {
    fn predict(&self, row: &FeatureRow) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_columns
            .lock()
            .unwrap()
            .push(row.column_names().map(str::to_string).collect());

        if let Some(known) = &self.known_sex {
            let sex = row.get("Sex").map(FeatureValue::to_text).unwrap_or_default();
            if !known.contains(&sex) {
                return Err(ClassifierError::PredictionError(format!(
                    "Found unknown category '{}' in column Sex",
                    sex
                )));
            }
        }
        Ok(self.label.clone())
    }

    fn predict_proba(&self, _row: &FeatureRow) -> ProbabilityOutcome {
        match &self.proba {
            ProbaMode::Returns(values) => ProbabilityOutcome::Available(values.clone()),
            ProbaMode::Unsupported => ProbabilityOutcome::Unsupported,
            ProbaMode::Fails => ProbabilityOutcome::Failed("predict_proba is not available".into()),
        }
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// A classifier that only implements the mandatory capability.
pub struct LabelOnlyModel;

impl StageModel for LabelOnlyModel {
    fn predict(&self, _row: &FeatureRow) -> Result<String, ClassifierError> {
        Ok("Stage_2".to_string())
    }

    fn classes(&self) -> &[String] {
        &[]
    }
}
