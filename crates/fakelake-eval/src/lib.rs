//! Read-back verification of generated datasets.
//!
//! The evaluator reopens every table a run wrote, checks the relational and
//! value rules the generator promises, and emits a metrics report plus a
//! markdown summary next to the data.

pub mod engine;
pub mod errors;
pub mod metrics;
pub mod model;
mod reader;
pub mod report;

pub use engine::EvaluationEngine;
pub use errors::EvalError;
pub use metrics::{CheckStats, CheckSummary, FactMetrics, MetricsReport, TableMetrics};
pub use model::{EvaluateOptions, EvaluationResult, Violation};
pub use report::render_report;
