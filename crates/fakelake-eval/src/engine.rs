use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::datatypes::{Date32Type, Int32Type, Int64Type};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use tracing::info;

use fakelake_core::layout::{MANIFEST_FILE, OutputLayout};
use fakelake_core::schema::{ID_COLUMN, UNIT_PRICE_COLUMN};
use fakelake_core::{Dimension, SALES};
use fakelake_generate::output::atomic::write_bytes_atomic;
use fakelake_generate::output::days_to_date;
use fakelake_generate::{FactManifest, GenerationReport};

use crate::errors::EvalError;
use crate::metrics::{
    CheckStats, CheckSummary, FactMetrics, METRICS_VERSION, MetricsReport, PerformanceMetrics,
    TableMetrics, WarningItem,
};
use crate::model::{EvaluateOptions, EvaluationResult, Violation};
use crate::reader;
use crate::report::render_report;

pub const METRICS_FILE: &str = "evaluation_metrics.json";
pub const REPORT_FILE: &str = "evaluation_report.md";
pub const VIOLATIONS_FILE: &str = "violations.json";

/// Evaluate a generated dataset against the rules the generator guarantees.
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    options: EvaluateOptions,
}

impl EvaluationEngine {
    pub fn new(options: EvaluateOptions) -> Self {
        Self { options }
    }

    pub fn run(&self, base_dir: &Path) -> Result<EvaluationResult, EvalError> {
        let total_start = Instant::now();
        let load_start = Instant::now();

        if !base_dir.is_dir() {
            return Err(EvalError::InvalidDataset(format!(
                "dataset directory {} does not exist",
                base_dir.display()
            )));
        }

        let layout = OutputLayout::new(base_dir);
        let mut warnings = Vec::new();
        let generation = load_generation_report(&layout, &mut warnings);
        let manifest = load_manifest(&layout, &mut warnings);
        let window = self.sale_window(manifest.as_ref(), &mut warnings);

        let mut checks = CheckSummary::default();
        let mut log = ViolationLog::new(self.options.max_examples);

        let mut tables = Vec::new();
        let dimensions = load_dimensions(&layout, &mut tables, &mut checks, &mut log)?;
        for table in &mut tables {
            table.rows_expected = generation.as_ref().and_then(|report| {
                report
                    .tables
                    .iter()
                    .find(|t| t.table == table.table)
                    .map(|t| t.rows_requested)
            });
        }

        let chunks = discover_chunks(&layout.fact_dir(), &mut warnings)?;
        let load_ms = load_start.elapsed().as_millis();
        let validate_start = Instant::now();

        let mut facts = evaluate_facts(&chunks, &dimensions, window, &mut checks, &mut log)?;
        facts.rows_expected = manifest
            .as_ref()
            .map(|manifest| manifest.params.total_rows)
            .or_else(|| {
                generation
                    .as_ref()
                    .and_then(|report| report.facts.as_ref())
                    .map(|facts| facts.total_rows)
            });

        check_row_counts(&tables, &facts, &mut checks, &mut log);

        let validate_ms = validate_start.elapsed().as_millis();
        let total_ms = total_start.elapsed().as_millis();

        let metrics = MetricsReport {
            metrics_version: METRICS_VERSION.to_string(),
            run_id: generation
                .as_ref()
                .map(|report| report.run_id.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            seed: generation.as_ref().map(|report| report.seed),
            base_dir: base_dir.display().to_string(),
            tables,
            facts,
            violations_total: log.total,
            checks,
            warnings,
            performance: PerformanceMetrics {
                load_ms,
                validate_ms,
                total_ms,
            },
        };
        let violations = log.kept;

        let report = render_report(&metrics, &violations, self.options.max_examples);
        let out_dir = self
            .options
            .out_dir
            .clone()
            .unwrap_or_else(|| base_dir.to_path_buf());
        std::fs::create_dir_all(&out_dir)?;

        let metrics_path = out_dir.join(METRICS_FILE);
        write_artifact(&metrics_path, &serde_json::to_vec_pretty(&metrics)?)?;

        let report_path = out_dir.join(REPORT_FILE);
        write_artifact(&report_path, report.as_bytes())?;

        let violations_path = if self.options.write_violations {
            let path = out_dir.join(VIOLATIONS_FILE);
            write_artifact(&path, &serde_json::to_vec_pretty(&violations)?)?;
            Some(path)
        } else {
            None
        };

        info!(
            base_dir = %base_dir.display(),
            fact_rows = metrics.facts.rows_found,
            violations = metrics.violations_total,
            total_ms = metrics.performance.total_ms,
            "evaluation completed"
        );

        if self.options.strict && metrics.violations_total > 0 {
            return Err(EvalError::Violations(metrics.violations_total));
        }

        Ok(EvaluationResult {
            out_dir,
            metrics_path,
            report_path,
            violations_path,
            metrics,
            report,
            violations,
        })
    }

    fn sale_window(
        &self,
        manifest: Option<&FactManifest>,
        warnings: &mut Vec<WarningItem>,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let params = manifest.map(|manifest| &manifest.params);
        let start = self.options.start_date.or(params.map(|p| p.start_date));
        let end = self.options.end_date.or(params.map(|p| p.end_date));
        match (start, end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => {
                warnings.push(WarningItem {
                    code: "sale_window_unknown".to_string(),
                    path: SALES.name.to_string(),
                    message: "sale date range not checked".to_string(),
                    hint: Some("pass start/end dates or keep the fact manifest".to_string()),
                });
                None
            }
        }
    }
}

/// Counts every violation and keeps the first few examples of each code.
struct ViolationLog {
    max_examples: usize,
    kept_by_code: HashMap<&'static str, usize>,
    kept: Vec<Violation>,
    total: u64,
}

impl ViolationLog {
    fn new(max_examples: usize) -> Self {
        Self {
            max_examples,
            kept_by_code: HashMap::new(),
            kept: Vec::new(),
            total: 0,
        }
    }

    fn check(
        &mut self,
        stats: &mut CheckStats,
        ok: bool,
        code: &'static str,
        violation: impl FnOnce() -> (String, String, Option<i64>, Option<String>),
    ) {
        stats.checked += 1;
        if ok {
            return;
        }
        stats.violations += 1;
        self.total += 1;
        let kept = self.kept_by_code.entry(code).or_insert(0);
        if *kept < self.max_examples {
            *kept += 1;
            let (path, message, row_id, example) = violation();
            self.kept.push(Violation {
                code: code.to_string(),
                path,
                message,
                row_id,
                example,
            });
        }
    }
}

struct DimensionData {
    customers: HashSet<i64>,
    stores: HashSet<i64>,
    prices: HashMap<i64, i128>,
}

fn load_dimensions(
    layout: &OutputLayout,
    tables: &mut Vec<TableMetrics>,
    checks: &mut CheckSummary,
    log: &mut ViolationLog,
) -> Result<DimensionData, EvalError> {
    let mut data = DimensionData {
        customers: HashSet::new(),
        stores: HashSet::new(),
        prices: HashMap::new(),
    };

    for dimension in Dimension::ALL {
        let path = layout.dimension_path(dimension);
        let table = dimension.table_name();
        let mut expected_id = 1_i64;

        for batch in reader::open(&path)? {
            let batch = batch?;
            check_nulls(&batch, table, checks, log);
            let ids = reader::primitive::<Int64Type>(&batch, ID_COLUMN, table)?;
            let prices = if dimension == Dimension::Products {
                Some(reader::money(&batch, UNIT_PRICE_COLUMN, table)?)
            } else {
                None
            };

            for (row, id) in ids.values().iter().enumerate() {
                let id = *id;
                log.check(&mut checks.dimension_ids, id == expected_id, "dimension_id_not_dense", || {
                    (
                        format!("{table}.{ID_COLUMN}"),
                        format!("expected id {expected_id}"),
                        Some(id),
                        None,
                    )
                });
                expected_id += 1;

                match dimension {
                    Dimension::Customers => {
                        data.customers.insert(id);
                    }
                    Dimension::Stores => {
                        data.stores.insert(id);
                    }
                    Dimension::Products => {
                        if let Some(prices) = prices {
                            let cents = prices.value(row);
                            log.check(&mut checks.unit_value, cents > 0, "unit_price_not_positive", || {
                                (
                                    format!("{table}.{UNIT_PRICE_COLUMN}"),
                                    "unit price must be positive".to_string(),
                                    Some(id),
                                    Some(format_cents(cents)),
                                )
                            });
                            data.prices.insert(id, cents);
                        }
                    }
                }
            }
        }

        tables.push(TableMetrics {
            table: table.to_string(),
            rows_found: (expected_id - 1) as u64,
            rows_expected: None,
        });
    }

    Ok(data)
}

/// One file of a chunk; `partition` is set for the hive layout.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChunkFile {
    path: PathBuf,
    relative: String,
    partition: Option<(i32, i32)>,
}

fn discover_chunks(
    fact_dir: &Path,
    warnings: &mut Vec<WarningItem>,
) -> Result<BTreeMap<u64, Vec<ChunkFile>>, EvalError> {
    let mut chunks: BTreeMap<u64, Vec<ChunkFile>> = BTreeMap::new();
    if !fact_dir.is_dir() {
        warnings.push(WarningItem {
            code: "facts_missing".to_string(),
            path: SALES.name.to_string(),
            message: "no fact directory found".to_string(),
            hint: Some("run the facts stage".to_string()),
        });
        return Ok(chunks);
    }

    for entry in sorted_entries(fact_dir)? {
        let name = file_name(&entry);
        if entry.is_dir() {
            let Some(year) = partition_value(&name, "year=") else {
                unexpected(warnings, &name);
                continue;
            };
            for month_dir in sorted_entries(&entry)? {
                let month_name = file_name(&month_dir);
                let month = partition_value(&month_name, "month=");
                let Some(month) = month.filter(|_| month_dir.is_dir()) else {
                    unexpected(warnings, &format!("{name}/{month_name}"));
                    continue;
                };
                for file in sorted_entries(&month_dir)? {
                    let file_name = file_name(&file);
                    let relative = format!("{name}/{month_name}/{file_name}");
                    match OutputLayout::parse_chunk_index(&file_name) {
                        Some(index) => chunks.entry(index).or_default().push(ChunkFile {
                            path: file,
                            relative,
                            partition: Some((year, month)),
                        }),
                        None => unexpected(warnings, &relative),
                    }
                }
            }
        } else if let Some(index) = OutputLayout::parse_chunk_index(&name) {
            chunks.entry(index).or_default().push(ChunkFile {
                path: entry,
                relative: name,
                partition: None,
            });
        } else if name != MANIFEST_FILE {
            unexpected(warnings, &name);
        }
    }

    for (position, index) in chunks.keys().enumerate() {
        if *index != position as u64 {
            warnings.push(WarningItem {
                code: "chunk_index_gap".to_string(),
                path: SALES.name.to_string(),
                message: format!("chunk {index} found at position {position}"),
                hint: None,
            });
            break;
        }
    }

    Ok(chunks)
}

fn evaluate_facts(
    chunks: &BTreeMap<u64, Vec<ChunkFile>>,
    dims: &DimensionData,
    window: Option<(NaiveDate, NaiveDate)>,
    checks: &mut CheckSummary,
    log: &mut ViolationLog,
) -> Result<FactMetrics, EvalError> {
    let mut metrics = FactMetrics {
        partition_layout: partition_layout(chunks).to_string(),
        chunks_found: chunks.len() as u64,
        ..FactMetrics::default()
    };
    let mut next_id = 1_i64;

    for (index, files) in chunks {
        let mut chunk_ids = Vec::new();
        for file in files {
            metrics.files_found += 1;
            let label = format!("{}/{}", SALES.name, file.relative);
            for batch in reader::open(&file.path)? {
                let batch = batch?;
                check_nulls(&batch, &label, checks, log);
                check_fact_batch(&batch, &label, file.partition, dims, window, checks, log)?;
                chunk_ids.extend_from_slice(reader::primitive::<Int64Type>(&batch, ID_COLUMN, &label)?.values());
            }
        }

        chunk_ids.sort_unstable();
        for (offset, id) in chunk_ids.iter().enumerate() {
            let expected = next_id + offset as i64;
            log.check(&mut checks.fact_ids, *id == expected, "fact_id_not_contiguous", || {
                (
                    format!("{}/chunk {index}", SALES.name),
                    format!("expected sale id {expected}"),
                    Some(*id),
                    None,
                )
            });
        }
        if let (Some(first), Some(last)) = (chunk_ids.first(), chunk_ids.last()) {
            metrics.min_id = Some(metrics.min_id.map_or(*first, |min| min.min(*first)));
            metrics.max_id = Some(metrics.max_id.map_or(*last, |max| max.max(*last)));
        }
        next_id += chunk_ids.len() as i64;
        metrics.rows_found += chunk_ids.len() as u64;
    }

    Ok(metrics)
}

fn check_fact_batch(
    batch: &RecordBatch,
    label: &str,
    partition: Option<(i32, i32)>,
    dims: &DimensionData,
    window: Option<(NaiveDate, NaiveDate)>,
    checks: &mut CheckSummary,
    log: &mut ViolationLog,
) -> Result<(), EvalError> {
    let ids = reader::primitive::<Int64Type>(batch, ID_COLUMN, label)?.values();
    let customers = reader::primitive::<Int64Type>(batch, "customer_id", label)?.values();
    let products = reader::primitive::<Int64Type>(batch, "product_id", label)?.values();
    let stores = reader::primitive::<Int64Type>(batch, "store_id", label)?.values();
    let sale_dates = reader::primitive::<Date32Type>(batch, "sale_date", label)?.values();
    let quantities = reader::primitive::<Int32Type>(batch, "quantity", label)?.values();
    let unit_values = reader::money(batch, "unit_value", label)?.values();
    let total_values = reader::money(batch, "total_value", label)?.values();
    let years = reader::primitive::<Int32Type>(batch, "year", label)?.values();
    let months = reader::primitive::<Int32Type>(batch, "month", label)?.values();

    for row in 0..batch.num_rows() {
        let id = ids[row];
        let path = |column: &str| format!("{label}:{column}");

        let customer = customers[row];
        log.check(&mut checks.referential, dims.customers.contains(&customer), "unknown_customer", || {
            (path("customer_id"), "customer not in dim_clientes".to_string(), Some(id), Some(customer.to_string()))
        });
        let store = stores[row];
        log.check(&mut checks.referential, dims.stores.contains(&store), "unknown_store", || {
            (path("store_id"), "store not in dim_lojas".to_string(), Some(id), Some(store.to_string()))
        });

        let product = products[row];
        let price = dims.prices.get(&product).copied();
        log.check(&mut checks.referential, price.is_some(), "unknown_product", || {
            (path("product_id"), "product not in dim_produtos".to_string(), Some(id), Some(product.to_string()))
        });
        let unit = unit_values[row];
        if let Some(price) = price {
            log.check(&mut checks.unit_value, unit == price, "unit_value_mismatch", || {
                (
                    path("unit_value"),
                    format!("expected product price {}", format_cents(price)),
                    Some(id),
                    Some(format_cents(unit)),
                )
            });
        }

        let quantity = quantities[row];
        log.check(&mut checks.quantity, quantity >= 1, "quantity_below_one", || {
            (path("quantity"), "quantity must be at least 1".to_string(), Some(id), Some(quantity.to_string()))
        });

        let total = total_values[row];
        let base = quantity as f64 * unit as f64;
        let within = (total as f64) >= base * 0.8 - 1.0 && (total as f64) <= base * 1.1 + 1.0;
        log.check(&mut checks.total_value, within, "total_value_out_of_bounds", || {
            (
                path("total_value"),
                format!(
                    "expected between {} and {}",
                    format_cents((base * 0.8).round() as i128),
                    format_cents((base * 1.1).round() as i128)
                ),
                Some(id),
                Some(format_cents(total)),
            )
        });

        let date = days_to_date(sale_dates[row]);
        let derived = date.map(|date| (date.year(), date.month() as i32));
        let stored = (years[row], months[row]);
        log.check(&mut checks.partition_keys, derived == Some(stored), "partition_key_mismatch", || {
            (
                path("year/month"),
                format!("sale_date {date:?} disagrees with year/month"),
                Some(id),
                Some(format!("{}/{}", stored.0, stored.1)),
            )
        });
        if let Some(partition) = partition {
            log.check(&mut checks.partition_keys, partition == stored, "partition_dir_mismatch", || {
                (
                    label.to_string(),
                    format!("row belongs to year={}/month={:02}", stored.0, stored.1),
                    Some(id),
                    None,
                )
            });
        }

        if let Some((start, end)) = window {
            let inside = date.is_some_and(|date| date >= start && date <= end);
            log.check(&mut checks.sale_date_range, inside, "sale_date_out_of_range", || {
                (
                    path("sale_date"),
                    format!("expected a date between {start} and {end}"),
                    Some(id),
                    date.map(|date| date.to_string()),
                )
            });
        }
    }

    Ok(())
}

fn check_row_counts(
    tables: &[TableMetrics],
    facts: &FactMetrics,
    checks: &mut CheckSummary,
    log: &mut ViolationLog,
) {
    let expected = tables
        .iter()
        .map(|table| (table.table.clone(), table.rows_found, table.rows_expected))
        .chain([(SALES.name.to_string(), facts.rows_found, facts.rows_expected)]);
    for (table, found, expected) in expected {
        let Some(expected) = expected else {
            continue;
        };
        log.check(&mut checks.row_counts, found == expected, "row_count_mismatch", || {
            (
                table.clone(),
                format!("expected {expected} rows"),
                None,
                Some(found.to_string()),
            )
        });
    }
}

fn check_nulls(batch: &RecordBatch, label: &str, checks: &mut CheckSummary, log: &mut ViolationLog) {
    let nulls = reader::null_count(batch);
    log.check(&mut checks.not_null, nulls == 0, "null_value", || {
        (
            label.to_string(),
            "non-nullable columns contain nulls".to_string(),
            None,
            Some(nulls.to_string()),
        )
    });
}

fn partition_layout(chunks: &BTreeMap<u64, Vec<ChunkFile>>) -> &'static str {
    let files = chunks.values().flatten();
    let hive = files.clone().filter(|file| file.partition.is_some()).count();
    let total = files.count();
    match (hive, total) {
        (_, 0) => "none",
        (0, _) => "columns",
        (hive, total) if hive == total => "hive",
        _ => "mixed",
    }
}

fn load_generation_report(
    layout: &OutputLayout,
    warnings: &mut Vec<WarningItem>,
) -> Option<GenerationReport> {
    let path = layout.report_path();
    let data = std::fs::read(&path).ok()?;
    match serde_json::from_slice(&data) {
        Ok(report) => Some(report),
        Err(err) => {
            warnings.push(WarningItem {
                code: "generation_report_unreadable".to_string(),
                path: path.display().to_string(),
                message: err.to_string(),
                hint: None,
            });
            None
        }
    }
}

fn load_manifest(layout: &OutputLayout, warnings: &mut Vec<WarningItem>) -> Option<FactManifest> {
    match FactManifest::load(&layout.manifest_path()) {
        Ok(manifest) => manifest,
        Err(err) => {
            warnings.push(WarningItem {
                code: "manifest_unreadable".to_string(),
                path: layout.manifest_path().display().to_string(),
                message: err.to_string(),
                hint: None,
            });
            None
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, EvalError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn partition_value(name: &str, prefix: &str) -> Option<i32> {
    name.strip_prefix(prefix)?.parse().ok()
}

fn unexpected(warnings: &mut Vec<WarningItem>, name: &str) {
    warnings.push(WarningItem {
        code: "unexpected_file".to_string(),
        path: format!("{}/{name}", SALES.name),
        message: "not part of the fact table".to_string(),
        hint: None,
    });
}

fn format_cents(cents: i128) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

fn write_artifact(path: &Path, data: &[u8]) -> Result<(), EvalError> {
    write_bytes_atomic(path, data).map_err(|source| EvalError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_render_with_two_decimals() {
        assert_eq!(format_cents(123_456), "1234.56");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-250), "-2.50");
    }

    #[test]
    fn violation_log_caps_examples_per_code() {
        let mut log = ViolationLog::new(2);
        let mut stats = CheckStats::default();
        for id in 0..5 {
            log.check(&mut stats, false, "a", || ("p".into(), "m".into(), Some(id), None));
        }
        log.check(&mut stats, false, "b", || ("p".into(), "m".into(), None, None));
        log.check(&mut stats, true, "b", || ("p".into(), "m".into(), None, None));

        assert_eq!(stats.checked, 7);
        assert_eq!(stats.violations, 6);
        assert_eq!(log.total, 6);
        assert_eq!(log.kept.len(), 3);
    }

    #[test]
    fn partition_values_parse_only_with_prefix() {
        assert_eq!(partition_value("year=2024", "year="), Some(2024));
        assert_eq!(partition_value("month=03", "month="), Some(3));
        assert_eq!(partition_value("2024", "year="), None);
    }
}
