use std::io::{self, BufRead, Write};

use crate::artifacts::ArtifactStore;
use crate::form::{Control, ControlValue, Form, FormError, GRID_COLUMNS};
use crate::inference::{infer, PredictionResult};
use crate::schema::resolve;

/// What the prediction view ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    Predicted(PredictionResult),
    /// Artifacts could not be loaded; the view stopped before the form.
    ArtifactsUnavailable(String),
    /// The classifier rejected this request.
    PredictionFailed(String),
}

/// Supplies values for the form's controls.
pub trait FieldSource {
    fn fill(&mut self, form: &mut Form, out: &mut dyn Write) -> io::Result<()>;
}

/// Values given up front as `NAME=VALUE` pairs.
#[derive(Debug, Clone, Default)]
pub struct PresetValues {
    pairs: Vec<(String, String)>,
}

impl PresetValues {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Splits `NAME=VALUE` at the first `=`.
    pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
        raw.split_once('=')
            .map(|(name, value)| (name.trim().to_string(), value.to_string()))
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
    }
}

impl FieldSource for PresetValues {
    fn fill(&mut self, form: &mut Form, out: &mut dyn Write) -> io::Result<()> {
        for (name, value) in &self.pairs {
            if let Err(e) = form.set(name, value) {
                writeln!(out, "Warning: {}", e)?;
            }
        }
        Ok(())
    }
}

/// Asks for every field in schema order on a line-based reader.
///
/// An empty answer keeps the control's default; a rejected number is asked again.
pub struct Prompter<R> {
    input: R,
}

impl<R: BufRead> Prompter<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> FieldSource for Prompter<R> {
    fn fill(&mut self, form: &mut Form, out: &mut dyn Write) -> io::Result<()> {
        for control in form.controls_mut() {
            loop {
                let hint = match control.value() {
                    ControlValue::Number(_) => format!(" [{}]", control.display_value()),
                    ControlValue::Text(_) => String::new(),
                };
                write!(out, "{}{}: ", control.name(), hint)?;
                out.flush()?;

                let mut line = String::new();
                if self.input.read_line(&mut line)? == 0 {
                    // End of input: keep the remaining defaults.
                    return Ok(());
                }
                let answer = line.trim_end_matches(['\r', '\n']);
                if answer.is_empty() {
                    break;
                }
                match control.set_input(answer) {
                    Ok(()) => break,
                    Err(e @ FormError::NotNumeric { .. }) => writeln!(out, "  {}", e)?,
                    Err(e) => {
                        writeln!(out, "  {}", e)?;
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Loads the artifacts, collects one record through `source` and predicts its stage.
pub fn render_prediction(
    out: &mut dyn Write,
    store: &ArtifactStore,
    source: &mut dyn FieldSource,
    json: bool,
) -> io::Result<PredictOutcome> {
    let artifacts = match store.load() {
        Ok(artifacts) => artifacts,
        Err(e) => {
            log::error!("Artifact load failed: {}", e);
            let message = format!("Failed to load model/features: {}", e);
            writeln!(out, "{}", message)?;
            return Ok(PredictOutcome::ArtifactsUnavailable(message));
        }
    };

    let schema = resolve(&artifacts.descriptor);
    let mut form = Form::from_schema(&schema);

    writeln!(out, "Patient Details")?;
    source.fill(&mut form, out)?;
    render_form(out, &form)?;

    let record = form.submit();
    let result = match infer(artifacts.model.as_ref(), &artifacts.descriptor, &record) {
        Ok(result) => result,
        Err(e) => {
            log::error!("Prediction failed: {}", e);
            let message = format!("Prediction failed: {}", e);
            writeln!(out, "{}", message)?;
            return Ok(PredictOutcome::PredictionFailed(message));
        }
    };

    if json {
        let text = serde_json::to_string_pretty(&result).map_err(io::Error::other)?;
        writeln!(out, "{}", text)?;
    } else {
        render_result(out, &result)?;
    }
    Ok(PredictOutcome::Predicted(result))
}

fn render_form(out: &mut dyn Write, form: &Form) -> io::Result<()> {
    let cell = |c: &Control| format!("{}: {}", c.name(), c.display_value());
    let width = form.controls().iter().map(|c| cell(c).chars().count()).max().unwrap_or(0);

    for row in form.grid(GRID_COLUMNS) {
        let line: Vec<String> = row
            .iter()
            .map(|c| format!("{:<width$}", cell(*c), width = width))
            .collect();
        writeln!(out, "  {}", line.join("  ").trim_end())?;
    }
    Ok(())
}

fn render_result(out: &mut dyn Write, result: &PredictionResult) -> io::Result<()> {
    writeln!(out, "Predicted Stage: {}", result.label)?;
    if result.probabilities.is_some() {
        writeln!(out, "Probabilities:")?;
        for (label, probability) in result.ranked() {
            writeln!(out, "    {}: {:.1}%", label, probability * 100.0)?;
        }
    }
    Ok(())
}
