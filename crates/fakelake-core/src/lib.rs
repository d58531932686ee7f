//! Core contracts and helpers for fakelake.
//!
//! This crate defines the table contracts, the on-disk output layout, and the
//! run configuration shared by the generator, the evaluator, and the CLI.

pub mod config;
pub mod error;
pub mod layout;
pub mod schema;
pub mod types;
pub mod validation;

pub use config::{
    Compression, DimensionSizes, FactConfig, GenerationConfig, OutputConfig, PartitionLayout,
};
pub use error::{Error, Result};
pub use layout::OutputLayout;
pub use schema::{Column, Dimension, SALES, TableSpec};
pub use types::ColumnType;
pub use validation::validate_config;

/// Contract version for manifests and reports written next to the data.
pub const ARTIFACT_VERSION: &str = "0.1";
