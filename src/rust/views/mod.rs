//! Terminal front end: the prediction view and the dataset dashboard.
//!
//! Each view catches the errors of its own boundary and renders them as
//! messages, so a failure in one never takes down the other or the process.

mod charts;
pub mod dashboard;
pub mod predict;

pub use dashboard::{render_dashboard, DashboardOptions, DashboardOutcome};
pub use predict::{render_prediction, FieldSource, PredictOutcome, PresetValues, Prompter};
