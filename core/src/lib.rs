//! Core data model and processing stages for condition-averaged ERP/ERF output.
//!
//! Epochs are loaded once, averaged per condition in ascending identifier order,
//! rendered to PNG figures and collected into an HTML report plus a
//! `product.json` manifest.

pub mod epochs;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod report;
pub mod telemetry;

pub use prelude::{ProcessingStage, StageConfig, StageError, StageResult};
