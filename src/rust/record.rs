use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::schema::FeatureDescriptor;

/// A single scalar entered for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Text(String),
    Number(f64),
}

impl FeatureValue {
    /// Numeric view of the value. Text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Text view of the value, as a string-typed model input sees it.
    pub fn to_text(&self) -> String {
        match self {
            FeatureValue::Text(s) => s.clone(),
            FeatureValue::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Text(s) => write!(f, "{}", s),
            FeatureValue::Number(n) => write!(f, "{:.4}", n),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

/// One prediction request: feature name to entered value.
///
/// Built fresh from the form for every request and consumed by inference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientRecord {
    values: HashMap<String, FeatureValue>,
}

impl PatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// The single-row table handed to the classifier, columns in descriptor order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    columns: Vec<(String, FeatureValue)>,
}

/// Why a record could not be aligned to the descriptor's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    Missing(Vec<String>),
    Unexpected(Vec<String>),
}

impl fmt::Display for AlignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(names) => write!(f, "record is missing feature(s): {}", names.join(", ")),
            Self::Unexpected(names) => write!(f, "record has undeclared feature(s): {}", names.join(", ")),
        }
    }
}

impl std::error::Error for AlignmentError {}

impl FeatureRow {
    /// Aligns a record to `feature_columns` by name.
    ///
    /// The record's own ordering never matters; every declared column must be
    /// present and no other column may be.
    pub fn assemble(descriptor: &FeatureDescriptor, record: &PatientRecord) -> Result<Self, AlignmentError> {
        let missing: Vec<String> = descriptor
            .feature_columns
            .iter()
            .filter(|name| record.get(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(AlignmentError::Missing(missing));
        }

        if record.len() != descriptor.feature_columns.len() {
            let mut unexpected: Vec<String> = record
                .names()
                .filter(|name| !descriptor.feature_columns.iter().any(|c| c == *name))
                .map(str::to_string)
                .collect();
            unexpected.sort();
            return Err(AlignmentError::Unexpected(unexpected));
        }

        let columns = descriptor
            .feature_columns
            .iter()
            .filter_map(|name| record.get(name).map(|value| (name.clone(), value.clone())))
            .collect();
        Ok(Self { columns })
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
