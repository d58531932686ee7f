//! Chunked, memory-bounded generation of the sales fact table.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{ArrayRef, Date32Array, Decimal128Array, Int32Array, Int64Array, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Exp};
use tracing::{debug, info, warn};

use fakelake_core::layout::{MANIFEST_FILE, OutputLayout};
use fakelake_core::types::MONEY_SCALE;
use fakelake_core::{Dimension, FactConfig, GenerationConfig, PartitionLayout, SALES};

use crate::errors::GenerationError;
use crate::foreign::ForeignContext;
use crate::generators::chunk_rng;
use crate::manifest::{ChunkRecord, FactManifest, ManifestParams, ManifestStatus};
use crate::model::{ChunkReport, FactReport};
use crate::output::parquet::{publish_all, stage_batches, write_batches};
use crate::output::{WriterOptions, arrow_schema, date_to_days};
use crate::planner::{ChunkTask, plan_chunks};

/// Mean of the exponential distribution quantities are drawn from.
const QUANTITY_MEAN: f64 = 3.0;
const TOTAL_FACTOR_MIN: f64 = 0.8;
const TOTAL_FACTOR_MAX: f64 = 1.1;

/// Inclusive range of sale dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SaleWindow {
    pub fn day_span(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

impl From<&FactConfig> for SaleWindow {
    fn from(config: &FactConfig) -> Self {
        Self {
            start: config.start_date,
            end: config.end_date,
        }
    }
}

/// Column-oriented rows of one chunk. Monetary values are in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactChunk {
    pub index: u64,
    pub ids: Vec<i64>,
    pub customer_ids: Vec<i64>,
    pub product_ids: Vec<i64>,
    pub store_ids: Vec<i64>,
    pub sale_dates: Vec<NaiveDate>,
    pub quantities: Vec<i32>,
    pub unit_values: Vec<i64>,
    pub total_values: Vec<i64>,
    pub years: Vec<i32>,
    pub months: Vec<i32>,
}

impl FactChunk {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch, GenerationError> {
        let sale_dates: Vec<i32> = self.sale_dates.iter().map(|date| date_to_days(*date)).collect();
        let unit_values = Decimal128Array::from_iter_values(self.unit_values.iter().map(|v| *v as i128))
            .with_precision_and_scale(10, MONEY_SCALE)?;
        let total_values =
            Decimal128Array::from_iter_values(self.total_values.iter().map(|v| *v as i128))
                .with_precision_and_scale(14, MONEY_SCALE)?;

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(self.ids.clone())),
            Arc::new(Int64Array::from(self.customer_ids.clone())),
            Arc::new(Int64Array::from(self.product_ids.clone())),
            Arc::new(Int64Array::from(self.store_ids.clone())),
            Arc::new(Date32Array::from(sale_dates)),
            Arc::new(Int32Array::from(self.quantities.clone())),
            Arc::new(unit_values),
            Arc::new(total_values),
            Arc::new(Int32Array::from(self.years.clone())),
            Arc::new(Int32Array::from(self.months.clone())),
        ];
        Ok(RecordBatch::try_new(arrow_schema(&SALES), columns)?)
    }

    /// Row positions grouped by `(year, month)`, in ascending partition order.
    pub fn partitions(&self) -> BTreeMap<(i32, i32), Vec<u32>> {
        let mut partitions: BTreeMap<(i32, i32), Vec<u32>> = BTreeMap::new();
        for (row, (year, month)) in self.years.iter().zip(&self.months).enumerate() {
            partitions.entry((*year, *month)).or_default().push(row as u32);
        }
        partitions
    }
}

/// Draw the rows of one chunk.
///
/// Draws happen column by column in a fixed order (customers, products,
/// stores, dates, quantities, total factors) so a chunk is a pure function
/// of the random stream, the lookups, and the window.
pub fn generate_chunk<C, R>(
    lookups: &C,
    task: &ChunkTask,
    window: &SaleWindow,
    rng: &mut R,
) -> Result<FactChunk, GenerationError>
where
    C: ForeignContext,
    R: Rng + ?Sized,
{
    let rows = task.rows as usize;

    let mut customer_ids = Vec::with_capacity(rows);
    for _ in 0..rows {
        customer_ids.push(lookups.pick_key(Dimension::Customers, rng));
    }
    let mut product_ids = Vec::with_capacity(rows);
    for _ in 0..rows {
        product_ids.push(lookups.pick_key(Dimension::Products, rng));
    }
    let mut store_ids = Vec::with_capacity(rows);
    for _ in 0..rows {
        store_ids.push(lookups.pick_key(Dimension::Stores, rng));
    }

    let day_span = window.day_span();
    let mut sale_dates = Vec::with_capacity(rows);
    for _ in 0..rows {
        let offset = rng.random_range(0..=day_span);
        sale_dates.push(window.start + chrono::Duration::days(offset));
    }

    let quantity = quantity_distribution()?;
    let mut quantities = Vec::with_capacity(rows);
    for _ in 0..rows {
        quantities.push(draw_quantity(&quantity, rng));
    }

    let mut unit_values = Vec::with_capacity(rows);
    for product_id in &product_ids {
        unit_values.push(lookups.unit_price(*product_id)?);
    }

    let mut total_values = Vec::with_capacity(rows);
    for (quantity, unit) in quantities.iter().zip(&unit_values) {
        let factor = rng.random_range(TOTAL_FACTOR_MIN..=TOTAL_FACTOR_MAX);
        total_values.push((*quantity as f64 * *unit as f64 * factor).round() as i64);
    }

    let ids: Vec<i64> = (task.first_id..task.first_id + rows as i64).collect();
    let years = sale_dates.iter().map(|date| date.year()).collect();
    let months = sale_dates.iter().map(|date| date.month() as i32).collect();

    Ok(FactChunk {
        index: task.index,
        ids,
        customer_ids,
        product_ids,
        store_ids,
        sale_dates,
        quantities,
        unit_values,
        total_values,
        years,
        months,
    })
}

fn quantity_distribution() -> Result<Exp<f64>, GenerationError> {
    Ok(Exp::new(1.0 / QUANTITY_MEAN)?)
}

/// `max(1, floor(x))` for an exponential draw `x`.
fn draw_quantity<R: Rng + ?Sized>(distribution: &Exp<f64>, rng: &mut R) -> i32 {
    let value = distribution.sample(rng).floor();
    (value as i32).max(1)
}

/// Files published for one chunk, relative to the fact directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenChunk {
    pub files: Vec<String>,
    pub bytes: u64,
}

/// Persist a chunk under `layout`, one file per chunk or one per partition.
pub fn write_chunk(
    layout: &OutputLayout,
    chunk: &FactChunk,
    partition_layout: PartitionLayout,
    options: &WriterOptions,
) -> Result<WrittenChunk, GenerationError> {
    let schema = arrow_schema(&SALES);
    let batch = chunk.to_record_batch()?;
    let fact_dir = layout.fact_dir();
    let mut written = WrittenChunk {
        files: Vec::new(),
        bytes: 0,
    };

    match partition_layout {
        PartitionLayout::Columns => {
            let path = layout.chunk_path(chunk.index);
            written.bytes += write_batches(&path, schema, &[batch], options)?;
            written.files.push(relative_name(&fact_dir, &path));
        }
        PartitionLayout::Hive => {
            // Every partition is staged before any is renamed into place.
            let mut staged = Vec::new();
            for ((year, month), rows) in chunk.partitions() {
                let part = take_record_batch(&batch, &UInt32Array::from(rows))?;
                let path = layout.partitioned_chunk_path(year, month as u32, chunk.index);
                staged.push(stage_batches(&path, schema.clone(), &[part], options)?);
            }
            for (path, bytes) in publish_all(staged)? {
                written.bytes += bytes;
                written.files.push(relative_name(&fact_dir, &path));
            }
        }
    }

    Ok(written)
}

fn relative_name(fact_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(fact_dir).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Drives chunk generation for a whole run.
pub struct FactGenerator<'a, C: ForeignContext> {
    config: &'a GenerationConfig,
    lookups: &'a C,
    layout: OutputLayout,
    options: WriterOptions,
}

impl<'a, C: ForeignContext> FactGenerator<'a, C> {
    pub fn new(config: &'a GenerationConfig, lookups: &'a C) -> Self {
        Self {
            config,
            lookups,
            layout: config.layout(),
            options: WriterOptions::from(&config.output),
        }
    }

    pub fn run(&self, run_id: &str) -> Result<FactReport, GenerationError> {
        let started = Instant::now();
        let facts = &self.config.facts;
        let tasks = plan_chunks(facts.total_rows, facts.chunk_size)?;
        let params = ManifestParams::from(self.config);
        let manifest_path = self.layout.manifest_path();

        let mut manifest = self.prepare_manifest(run_id, params)?;
        manifest.save(&manifest_path)?;

        let mut report = FactReport::new(facts.total_rows, facts.chunk_size, facts.partition_layout);
        report.chunks_planned = tasks.len() as u64;

        info!(
            total_rows = facts.total_rows,
            chunk_size = facts.chunk_size,
            chunks = tasks.len(),
            partition_layout = %facts.partition_layout,
            resume = facts.resume,
            "fact generation started"
        );

        let outcome = self.run_chunks(&tasks, &mut manifest, &mut report);
        report.duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                manifest.status = ManifestStatus::Completed;
                manifest.save(&manifest_path)?;
                info!(
                    chunks_written = report.chunks_written,
                    chunks_skipped = report.chunks_skipped,
                    rows_generated = report.rows_generated,
                    duration_ms = report.duration_ms,
                    "fact generation completed"
                );
                Ok(report)
            }
            Err(err) => {
                manifest.status = ManifestStatus::Failed;
                if let Err(save_err) = manifest.save(&manifest_path) {
                    warn!(error = %save_err, "failed to mark fact manifest as failed");
                }
                Err(err)
            }
        }
    }

    fn run_chunks(
        &self,
        tasks: &[ChunkTask],
        manifest: &mut FactManifest,
        report: &mut FactReport,
    ) -> Result<(), GenerationError> {
        let facts = &self.config.facts;
        let window = SaleWindow::from(facts);
        let fact_dir = self.layout.fact_dir();
        let manifest_path = self.layout.manifest_path();
        let chunks = tasks.len();
        let mut total_generated = 0_u64;

        for task in tasks {
            if let Some(record) = manifest.completed_chunk(task.index, &fact_dir) {
                total_generated += record.rows;
                info!(
                    chunk = task.index,
                    chunks,
                    rows = record.rows,
                    total_generated,
                    "chunk already written, skipping"
                );
                report.record_chunk(ChunkReport {
                    index: record.index,
                    first_id: record.first_id,
                    last_id: record.last_id,
                    rows: record.rows,
                    files: record.files.clone(),
                    bytes_written: record.bytes,
                    duration_ms: 0,
                    skipped: true,
                });
                continue;
            }

            let chunk_started = Instant::now();
            let mut rng = chunk_rng(self.config.seed, SALES.name, task.index);
            let chunk = generate_chunk(self.lookups, task, &window, &mut rng)?;
            let written = write_chunk(&self.layout, &chunk, facts.partition_layout, &self.options)?;
            drop(chunk);

            manifest.record(ChunkRecord {
                index: task.index,
                first_id: task.first_id,
                last_id: task.last_id(),
                rows: task.rows,
                files: written.files.clone(),
                bytes: written.bytes,
            });
            manifest.save(&manifest_path)?;

            total_generated += task.rows;
            let duration_ms = chunk_started.elapsed().as_millis() as u64;
            info!(
                chunk = task.index,
                chunks,
                rows = task.rows,
                total_generated,
                files = written.files.len(),
                bytes = written.bytes,
                duration_ms,
                "chunk written"
            );
            report.record_chunk(ChunkReport {
                index: task.index,
                first_id: task.first_id,
                last_id: task.last_id(),
                rows: task.rows,
                files: written.files,
                bytes_written: written.bytes,
                duration_ms,
                skipped: false,
            });
        }

        Ok(())
    }

    fn prepare_manifest(
        &self,
        run_id: &str,
        params: ManifestParams,
    ) -> Result<FactManifest, GenerationError> {
        let fact_dir = self.layout.fact_dir();
        std::fs::create_dir_all(&fact_dir).map_err(|err| GenerationError::write(&fact_dir, err))?;

        if self.config.facts.resume {
            if let Some(mut existing) = FactManifest::load(&self.layout.manifest_path())? {
                existing.ensure_matches(&params)?;
                info!(
                    previous_run_id = %existing.run_id,
                    chunks_recorded = existing.chunks.len(),
                    rows_recorded = existing.rows_recorded(),
                    "resuming fact run"
                );
                existing.status = ManifestStatus::InProgress;
                return Ok(existing);
            }
            debug!("no fact manifest found, starting from chunk 0");
        }

        let removed = clear_fact_outputs(&fact_dir)?;
        if removed > 0 {
            warn!(
                removed,
                dir = %fact_dir.display(),
                "removed fact outputs of a previous run"
            );
        }
        Ok(FactManifest::new(run_id, params))
    }
}

/// Delete chunk files, partitions, temporaries and the manifest left in
/// `fact_dir`. Anything else is left alone.
fn clear_fact_outputs(fact_dir: &Path) -> Result<u64, GenerationError> {
    let entries = std::fs::read_dir(fact_dir).map_err(|err| GenerationError::write(fact_dir, err))?;
    let mut removed = 0_u64;
    for entry in entries {
        let entry = entry.map_err(|err| GenerationError::write(fact_dir, err))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry
            .file_type()
            .map_err(|err| GenerationError::write(&path, err))?;

        if file_type.is_dir() && name.starts_with("year=") {
            std::fs::remove_dir_all(&path).map_err(|err| GenerationError::write(&path, err))?;
            removed += 1;
        } else if file_type.is_file()
            && (name == MANIFEST_FILE
                || OutputLayout::parse_chunk_index(&name).is_some()
                || name.ends_with(".inprogress")
                || name.ends_with(".tmp"))
        {
            std::fs::remove_file(&path).map_err(|err| GenerationError::write(&path, err))?;
            removed += 1;
        }
    }
    Ok(removed)
}
