//! Schema-driven input form.
//!
//! The field set is only known at runtime, so the form is a list of controls
//! built by iterating the resolved schema. Each control owns its current
//! value and coerces raw text according to its kind.

use crate::record::{FeatureValue, PatientRecord};
use crate::schema::{FieldKind, FieldSpec};

/// Columns in the form grid.
pub const GRID_COLUMNS: usize = 3;
/// Increment applied by numeric step buttons.
pub const NUMERIC_STEP: f64 = 0.1;
/// Decimal places shown by numeric controls.
pub const NUMERIC_PRECISION: usize = 4;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FormError {
    #[error("No field named '{0}'")]
    UnknownField(String),
    #[error("'{input}' is not a number (field '{field}')")]
    NotNumeric { field: String, input: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlValue {
    Text(String),
    Number(f64),
}

/// One input control bound to a schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    spec: FieldSpec,
    value: ControlValue,
}

impl Control {
    /// A control holding the default for its kind: empty text or 0.0.
    pub fn new(spec: FieldSpec) -> Self {
        let value = match spec.kind {
            FieldKind::Numeric => ControlValue::Number(0.0),
            FieldKind::Categorical | FieldKind::Freeform => ControlValue::Text(String::new()),
        };
        Self { spec, value }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> FieldKind {
        self.spec.kind
    }

    pub fn value(&self) -> &ControlValue {
        &self.value
    }

    /// Accepts raw user text.
    ///
    /// Numeric controls keep their previous value when the text is not a finite
    /// number; range is never checked.
    pub fn set_input(&mut self, input: &str) -> Result<(), FormError> {
        match &mut self.value {
            ControlValue::Text(text) => {
                *text = input.to_string();
                Ok(())
            }
            ControlValue::Number(number) => match input.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => {
                    *number = parsed;
                    Ok(())
                }
                _ => Err(FormError::NotNumeric {
                    field: self.spec.name.clone(),
                    input: input.to_string(),
                }),
            },
        }
    }

    pub fn step_up(&mut self) {
        self.step(NUMERIC_STEP);
    }

    pub fn step_down(&mut self) {
        self.step(-NUMERIC_STEP);
    }

    fn step(&mut self, delta: f64) {
        if let ControlValue::Number(number) = &mut self.value {
            // Round to display precision so repeated steps don't drift.
            let scale = 10f64.powi(NUMERIC_PRECISION as i32);
            *number = ((*number + delta) * scale).round() / scale;
        }
    }

    /// The value as the control displays it.
    pub fn display_value(&self) -> String {
        match &self.value {
            ControlValue::Text(text) => text.clone(),
            ControlValue::Number(number) => format!("{:.*}", NUMERIC_PRECISION, number),
        }
    }

    fn feature_value(&self) -> FeatureValue {
        match &self.value {
            ControlValue::Text(text) => FeatureValue::Text(text.clone()),
            ControlValue::Number(number) => FeatureValue::Number(*number),
        }
    }
}

/// One control per schema field, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    controls: Vec<Control>,
}

impl Form {
    pub fn from_schema(schema: &[FieldSpec]) -> Self {
        Self {
            controls: schema.iter().cloned().map(Control::new).collect(),
        }
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> impl Iterator<Item = &mut Control> {
        self.controls.iter_mut()
    }

    pub fn control_mut(&mut self, name: &str) -> Result<&mut Control, FormError> {
        self.controls
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    pub fn set(&mut self, name: &str, input: &str) -> Result<(), FormError> {
        self.control_mut(name)?.set_input(input)
    }

    /// Row-major layout: control `i` sits in column `i % columns`.
    pub fn grid(&self, columns: usize) -> Vec<Vec<&Control>> {
        let columns = columns.max(1);
        self.controls.chunks(columns).map(|row| row.iter().collect()).collect()
    }

    /// Snapshots every control into a record keyed by field name.
    pub fn submit(&self) -> PatientRecord {
        let mut record = PatientRecord::new();
        for control in &self.controls {
            record.insert(control.name(), control.feature_value());
        }
        record
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
