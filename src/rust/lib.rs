//! Disease-stage prediction from a trained classifier, driven by a feature descriptor.
//!
//! The descriptor lists the columns the model consumes and how each is
//! collected. From it the crate derives an input schema, builds a form with
//! one control per field, aligns the submitted record to the model's columns
//! and returns the predicted stage with per-class probabilities when the
//! model can provide them.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use stageview::{infer, resolve, ArtifactPaths, ArtifactStore, Form};
//!
//! let store = ArtifactStore::new(ArtifactPaths::under("."));
//! let artifacts = store.load()?;
//!
//! let mut form = Form::from_schema(&resolve(&artifacts.descriptor));
//! form.set("Age", "58.8")?;
//! form.set("Sex", "F")?;
//!
//! let result = infer(artifacts.model.as_ref(), &artifacts.descriptor, &form.submit())?;
//! println!("Predicted stage: {}", result.label);
//! for (class, p) in result.ranked() {
//!     println!("{}: {:.2}", class, p);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Loaded artifacts are immutable and `Send + Sync`; share the `Arc` returned by
//! [`ArtifactStore::load`] across sessions and threads without locking.

pub mod artifacts;
pub mod classifier;
pub mod dashboard;
pub mod form;
pub mod inference;
pub mod record;
mod runtime;
pub mod schema;
pub mod views;

pub use artifacts::{ArtifactLoadError, ArtifactPaths, ArtifactStore, Artifacts};
pub use classifier::{ClassifierError, ClassifierInfo, OnnxStageModel, OnnxStageModelBuilder, ProbabilityOutcome, StageModel};
pub use dashboard::{Dataset, DatasetError, Histogram};
pub use form::{Control, ControlValue, Form, FormError};
pub use inference::{infer, PredictionError, PredictionResult};
pub use record::{FeatureRow, FeatureValue, PatientRecord};
pub use runtime::{create_session_builder, RuntimeConfig};
pub use schema::{resolve, FeatureDescriptor, FieldKind, FieldSpec};

pub fn init_logger() {
    env_logger::init();
}
