//! Synthetic star-schema generation for fakelake.
//!
//! This crate writes the three dimension tables, reads their keys back into
//! lookup structures, and runs the chunked fact generator that produces the
//! sales table as independent Parquet chunks.

pub mod engine;
pub mod errors;
pub mod facts;
pub mod foreign;
pub mod generators;
pub mod manifest;
pub mod model;
pub mod output;
pub mod planner;

pub use engine::{GenerationEngine, GenerationResult, Stages};
pub use errors::{GenerationError, StorageError};
pub use facts::{FactChunk, FactGenerator, SaleWindow, generate_chunk};
pub use foreign::{DimensionKeys, DimensionLookups, ForeignContext};
pub use manifest::{ChunkRecord, FactManifest, ManifestParams, ManifestStatus};
pub use model::{ChunkReport, FactReport, GenerationReport, RunStatus, TableReport};
pub use planner::{ChunkTask, plan_chunks};
