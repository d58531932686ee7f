#![allow(dead_code)]

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use arrow::array::AsArray;
use arrow::datatypes::{Date32Type, Decimal128Type, Int32Type, Int64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sha2::{Digest, Sha256};

use fakelake_core::{DimensionSizes, FactConfig, GenerationConfig};

pub fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("fakelake_{name}_{}", uuid::Uuid::new_v4()))
}

/// 10 customers, 5 products, 3 stores, 100 sales in chunks of 40.
pub fn small_config(base_dir: &Path) -> GenerationConfig {
    GenerationConfig {
        base_dir: base_dir.to_path_buf(),
        seed: 42,
        dimensions: DimensionSizes {
            customers: 10,
            products: 5,
            stores: 3,
        },
        facts: FactConfig {
            total_rows: 100,
            chunk_size: 40,
            ..FactConfig::default()
        },
        ..GenerationConfig::default()
    }
}

pub fn hash_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn read_batches(path: &Path) -> Vec<RecordBatch> {
    let file = File::open(path).expect("open parquet");
    ParquetRecordBatchReaderBuilder::try_new(file)
        .expect("reader builder")
        .build()
        .expect("reader")
        .map(|batch| batch.expect("batch"))
        .collect()
}

pub fn row_count(path: &Path) -> usize {
    read_batches(path).iter().map(|batch| batch.num_rows()).sum()
}

pub fn i64_column(batches: &[RecordBatch], name: &str) -> Vec<i64> {
    batches
        .iter()
        .flat_map(|batch| {
            batch
                .column_by_name(name)
                .expect("column")
                .as_primitive::<Int64Type>()
                .values()
                .to_vec()
        })
        .collect()
}

pub fn i32_column(batches: &[RecordBatch], name: &str) -> Vec<i32> {
    batches
        .iter()
        .flat_map(|batch| {
            batch
                .column_by_name(name)
                .expect("column")
                .as_primitive::<Int32Type>()
                .values()
                .to_vec()
        })
        .collect()
}

pub fn date_column(batches: &[RecordBatch], name: &str) -> Vec<i32> {
    batches
        .iter()
        .flat_map(|batch| {
            batch
                .column_by_name(name)
                .expect("column")
                .as_primitive::<Date32Type>()
                .values()
                .to_vec()
        })
        .collect()
}

pub fn cents_column(batches: &[RecordBatch], name: &str) -> Vec<i128> {
    batches
        .iter()
        .flat_map(|batch| {
            batch
                .column_by_name(name)
                .expect("column")
                .as_primitive::<Decimal128Type>()
                .values()
                .to_vec()
        })
        .collect()
}

/// Every Parquet file under `dir`, recursively, sorted by path.
pub fn parquet_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current).expect("read dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "parquet") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Every fact batch on disk, in path order, from either layout.
pub fn read_fact_batches(fact_dir: &Path) -> Vec<RecordBatch> {
    parquet_files(fact_dir)
        .iter()
        .flat_map(|path| read_batches(path))
        .collect()
}
