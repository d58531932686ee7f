use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use fakelake_core::{DimensionSizes, FactConfig, GenerationConfig, OutputLayout, PartitionLayout};
use fakelake_eval::{EvalError, EvaluateOptions, EvaluationEngine};
use fakelake_generate::GenerationEngine;
use fakelake_generate::output::WriterOptions;
use fakelake_generate::output::parquet::write_batches;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("fakelake_eval_{name}_{}", uuid::Uuid::new_v4()))
}

fn generate(dir: &Path, partition_layout: PartitionLayout) {
    let config = GenerationConfig {
        base_dir: dir.to_path_buf(),
        dimensions: DimensionSizes {
            customers: 10,
            products: 5,
            stores: 3,
        },
        facts: FactConfig {
            total_rows: 100,
            chunk_size: 40,
            partition_layout,
            ..FactConfig::default()
        },
        ..GenerationConfig::default()
    };
    GenerationEngine::new(config)
        .expect("engine")
        .run()
        .expect("generate");
}

fn lenient() -> EvaluateOptions {
    EvaluateOptions {
        strict: false,
        ..EvaluateOptions::default()
    }
}

#[test]
fn generated_dataset_passes_every_check() {
    let dir = temp_dir("clean");
    generate(&dir, PartitionLayout::Columns);

    let result = EvaluationEngine::new(EvaluateOptions::default())
        .run(&dir)
        .expect("strict evaluation");

    let metrics = &result.metrics;
    assert_eq!(metrics.violations_total, 0);
    assert_eq!(metrics.facts.rows_found, 100);
    assert_eq!(metrics.facts.rows_expected, Some(100));
    assert_eq!(metrics.facts.chunks_found, 3);
    assert_eq!(metrics.facts.partition_layout, "columns");
    assert_eq!((metrics.facts.min_id, metrics.facts.max_id), (Some(1), Some(100)));
    assert_eq!(metrics.seed, Some(42));
    assert_eq!(metrics.checks.fact_ids.checked, 100);
    assert_eq!(metrics.checks.dimension_ids.checked, 18);
    assert!(metrics.checks.sale_date_range.checked > 0);
    assert!(result.metrics_path.is_file());
    assert!(result.report_path.is_file());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn hive_dataset_passes_every_check() {
    let dir = temp_dir("hive");
    generate(&dir, PartitionLayout::Hive);

    let result = EvaluationEngine::new(EvaluateOptions::default())
        .run(&dir)
        .expect("strict evaluation");
    assert_eq!(result.metrics.facts.partition_layout, "hive");
    assert_eq!(result.metrics.facts.rows_found, 100);
    assert!(result.metrics.checks.partition_keys.checked >= 200);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn tampered_quantities_are_reported() {
    let dir = temp_dir("tampered");
    generate(&dir, PartitionLayout::Columns);
    let path = OutputLayout::new(&dir).chunk_path(1);

    let file = std::fs::File::open(&path).expect("open");
    let batches: Vec<RecordBatch> = ParquetRecordBatchReaderBuilder::try_new(file)
        .expect("builder")
        .build()
        .expect("reader")
        .map(|batch| batch.expect("batch"))
        .collect();
    let schema = batches[0].schema();
    let quantity = schema.index_of("quantity").expect("quantity");
    let tampered: Vec<RecordBatch> = batches
        .iter()
        .map(|batch| {
            let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
            columns[quantity] = Arc::new(Int32Array::from(vec![0; batch.num_rows()]));
            RecordBatch::try_new(schema.clone(), columns).expect("tampered batch")
        })
        .collect();
    write_batches(&path, schema.clone(), &tampered, &WriterOptions::default()).expect("rewrite");

    let err = EvaluationEngine::new(EvaluateOptions::default())
        .run(&dir)
        .expect_err("strict evaluation fails");
    assert!(matches!(err, EvalError::Violations(count) if count >= 40));

    let result = EvaluationEngine::new(EvaluateOptions {
        max_examples: 3,
        write_violations: true,
        ..lenient()
    })
    .run(&dir)
    .expect("lenient evaluation");
    assert_eq!(result.metrics.checks.quantity.violations, 40);
    assert_eq!(
        result
            .violations
            .iter()
            .filter(|violation| violation.code == "quantity_below_one")
            .count(),
        3
    );
    assert!(result.violations_path.as_ref().is_some_and(|path| path.is_file()));
    assert!(result.report.contains("[quantity_below_one]"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_chunk_breaks_counts() {
    let dir = temp_dir("missing_chunk");
    generate(&dir, PartitionLayout::Columns);
    std::fs::remove_file(OutputLayout::new(&dir).chunk_path(1)).expect("remove chunk");

    let result = EvaluationEngine::new(lenient()).run(&dir).expect("evaluation");
    assert_eq!(result.metrics.facts.rows_found, 60);
    assert_eq!(result.metrics.checks.row_counts.violations, 1);
    assert_eq!(result.metrics.checks.fact_ids.violations, 20);
    assert!(
        result
            .metrics
            .warnings
            .iter()
            .any(|warning| warning.code == "chunk_index_gap")
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_dimension_is_an_invalid_dataset() {
    let dir = temp_dir("no_dimensions");
    std::fs::create_dir_all(&dir).expect("create dir");
    let err = EvaluationEngine::new(lenient()).run(&dir).expect_err("invalid");
    assert!(matches!(err, EvalError::InvalidDataset(_)));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unwritable_metrics_file_is_a_write_error() {
    let dir = temp_dir("blocked_metrics");
    generate(&dir, PartitionLayout::Columns);
    let out_dir = dir.join("eval");
    let metrics_path = out_dir.join(fakelake_eval::engine::METRICS_FILE);
    std::fs::create_dir_all(metrics_path.join("occupied")).expect("blocker");

    let options = EvaluateOptions {
        out_dir: Some(out_dir.clone()),
        ..EvaluateOptions::default()
    };
    let err = EvaluationEngine::new(options).run(&dir).expect_err("metrics path blocked");
    assert!(matches!(err, EvalError::Write { ref path, .. } if path == &metrics_path));

    let leftovers: Vec<_> = std::fs::read_dir(&out_dir)
        .expect("read out dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");

    let _ = std::fs::remove_dir_all(dir);
}
