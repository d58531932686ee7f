use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use fakelake_core::{Dimension, GenerationConfig, OutputLayout, validate_config};

use crate::errors::GenerationError;
use crate::facts::FactGenerator;
use crate::foreign::DimensionLookups;
use crate::generators::{DimensionContext, generator_for, table_rng};
use crate::model::{FactReport, GenerationReport, TableReport};
use crate::output::{ParquetTableWriter, WriterOptions, arrow_schema, write_json_atomic};

/// Rows generated per Arrow batch while writing a dimension table.
const DIMENSION_BATCH_ROWS: i64 = 64 * 1024;

/// Which parts of the dataset a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    pub dimensions: bool,
    pub facts: bool,
}

impl Stages {
    pub const ALL: Self = Self {
        dimensions: true,
        facts: true,
    };
    pub const DIMENSIONS: Self = Self {
        dimensions: true,
        facts: false,
    };
    pub const FACTS: Self = Self {
        dimensions: false,
        facts: true,
    };
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub base_dir: PathBuf,
    pub report: GenerationReport,
}

/// Entry point for generating the star schema: dimensions first, then facts.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    config: GenerationConfig,
    layout: OutputLayout,
    options: WriterOptions,
}

impl GenerationEngine {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        validate_config(&config)?;
        Ok(Self {
            layout: config.layout(),
            options: WriterOptions::from(&config.output),
            config,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn run(&self) -> Result<GenerationResult, GenerationError> {
        self.run_with(Stages::ALL)
    }

    pub fn run_dimensions(&self) -> Result<GenerationResult, GenerationError> {
        self.run_with(Stages::DIMENSIONS)
    }

    /// Generate facts against dimension tables already on disk.
    pub fn run_facts(&self) -> Result<GenerationResult, GenerationError> {
        self.run_with(Stages::FACTS)
    }

    pub fn run_with(&self, stages: Stages) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let base_dir = self.layout.base_dir().to_path_buf();
        std::fs::create_dir_all(&base_dir).map_err(|err| GenerationError::write(&base_dir, err))?;

        let mut report = GenerationReport::new(
            run_id.clone(),
            self.config.seed,
            base_dir.display().to_string(),
        );

        info!(
            run_id = %run_id,
            base_dir = %base_dir.display(),
            seed = self.config.seed,
            dimensions = stages.dimensions,
            facts = stages.facts,
            "generation started"
        );

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
            || -> Result<(), GenerationError> {
                if stages.dimensions {
                    for dimension in Dimension::ALL {
                        let table = self.generate_dimension(dimension)?;
                        report.bytes_written += table.bytes_written;
                        report.tables.push(table);
                    }
                }

                if stages.facts {
                    let lookups = DimensionLookups::load(&self.layout)?;
                    let facts = self.generate_facts(&lookups, &run_id)?;
                    report.bytes_written += facts.bytes_written;
                    report.facts = Some(facts);
                }

                Ok(())
            },
        ));

        let elapsed = start.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;
        report.throughput_bytes_per_sec = if elapsed.as_secs_f64() > 0.0 {
            report.bytes_written as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let report_path = self.layout.report_path();
        match outcome {
            Ok(Ok(())) => {
                write_json_atomic(&report_path, &report)?;
                info!(
                    run_id = %run_id,
                    tables = report.tables.len(),
                    fact_rows = report.facts.as_ref().map(|f| f.rows_available()).unwrap_or(0),
                    duration_ms = report.duration_ms,
                    bytes_written = report.bytes_written,
                    "generation completed"
                );
                Ok(GenerationResult { base_dir, report })
            }
            Ok(Err(err)) => {
                report.record_failure(err.to_string());
                write_failure_report(&report_path, &report);
                warn!(run_id = %run_id, error = %err, "generation failed");
                Err(err)
            }
            Err(panic) => {
                let message = panic_message(panic);
                report.record_failure(message.clone());
                write_failure_report(&report_path, &report);
                warn!(run_id = %run_id, "generation panicked");
                Err(GenerationError::Panicked(message))
            }
        }
    }

    /// Write one dimension table from its own random stream, replacing any
    /// previous file.
    fn generate_dimension(&self, dimension: Dimension) -> Result<TableReport, GenerationError> {
        let table_start = Instant::now();
        let rows = self.dimension_rows(dimension);
        let path = self.layout.dimension_path(dimension);
        info!(table = %dimension, rows, "generating table");

        let generator = generator_for(dimension);
        let ctx = DimensionContext {
            reference_date: self.config.reference_date,
        };
        let mut rng = table_rng(self.config.seed, dimension.table_name());
        let mut writer = ParquetTableWriter::create(&path, arrow_schema(dimension.spec()), &self.options)?;

        let end = rows as i64 + 1;
        let mut next = 1_i64;
        while next < end {
            let upto = (next + DIMENSION_BATCH_ROWS).min(end);
            let batch = generator.generate_batch(next..upto, &ctx, &mut rng)?;
            writer.write(&batch)?;
            next = upto;
        }
        let rows_generated = writer.rows();
        let bytes_written = writer.finish()?;

        let report = TableReport {
            table: dimension.table_name().to_string(),
            path: path.display().to_string(),
            rows_requested: rows,
            rows_generated,
            bytes_written,
            duration_ms: table_start.elapsed().as_millis() as u64,
        };
        info!(
            table = %dimension,
            rows_generated = report.rows_generated,
            bytes_written = report.bytes_written,
            duration_ms = report.duration_ms,
            "table generated"
        );
        Ok(report)
    }

    fn generate_facts(
        &self,
        lookups: &DimensionLookups,
        run_id: &str,
    ) -> Result<FactReport, GenerationError> {
        FactGenerator::new(&self.config, lookups).run(run_id)
    }

    fn dimension_rows(&self, dimension: Dimension) -> u64 {
        let sizes = &self.config.dimensions;
        match dimension {
            Dimension::Customers => sizes.customers,
            Dimension::Products => sizes.products,
            Dimension::Stores => sizes.stores,
        }
    }
}

/// Logs a failed report write; the caller returns the stage error.
fn write_failure_report(path: &Path, report: &GenerationReport) {
    if let Err(err) = write_json_atomic(path, report) {
        warn!(path = %path.display(), error = %err, "failed to write generation report");
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during generation".to_string()
    }
}
