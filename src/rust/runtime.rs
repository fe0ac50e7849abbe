use once_cell::sync::OnceCell;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;

use crate::classifier::ClassifierError;

/// Outcome of the one ONNX environment commit this process makes.
static INIT: OnceCell<Result<(), String>> = OnceCell::new();

/// Execution settings for the ONNX session backing a stage model.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl RuntimeConfig {
    /// Pins the intra-op thread count and leaves everything else at defaults.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            intra_threads: threads,
            ..Self::default()
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

// GraphOptimizationLevel is not Clone.
fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("stageview")
        .commit()?;
    Ok(())
}

/// Initializes the process-wide ONNX environment exactly once.
///
/// A failed commit is remembered: every later call reports the same error.
pub fn ensure_initialized() -> Result<(), ClassifierError> {
    init_once(&INIT, || init_onnx_environment().map_err(|e| e.to_string()))
}

fn init_once<F>(cell: &OnceCell<Result<(), String>>, init: F) -> Result<(), ClassifierError>
where
    F: FnOnce() -> Result<(), String>,
{
    cell.get_or_init(init).clone().map_err(|msg| {
        log::error!("Failed to initialize ONNX Runtime environment: {}", msg);
        ClassifierError::ModelError(format!("ONNX Runtime initialization failed: {}", msg))
    })
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}
