use std::fs::File;
use std::path::Path;

use arrow::array::{Array, AsArray, PrimitiveArray};
use arrow::datatypes::{ArrowPrimitiveType, Decimal128Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

use fakelake_core::types::MONEY_SCALE;

use crate::errors::EvalError;

pub(crate) fn open(path: &Path) -> Result<ParquetRecordBatchReader, EvalError> {
    let file = File::open(path).map_err(|err| {
        EvalError::InvalidDataset(format!("cannot open {}: {err}", path.display()))
    })?;
    Ok(ParquetRecordBatchReaderBuilder::try_new(file)?.build()?)
}

pub(crate) fn primitive<'a, T: ArrowPrimitiveType>(
    batch: &'a RecordBatch,
    name: &str,
    file: &str,
) -> Result<&'a PrimitiveArray<T>, EvalError> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_primitive_opt::<T>())
        .ok_or_else(|| {
            EvalError::InvalidDataset(format!(
                "{file}: column '{name}' is missing or has an unexpected type"
            ))
        })
}

/// A money column: Decimal128 with two fractional digits.
pub(crate) fn money<'a>(
    batch: &'a RecordBatch,
    name: &str,
    file: &str,
) -> Result<&'a PrimitiveArray<Decimal128Type>, EvalError> {
    let column = primitive::<Decimal128Type>(batch, name, file)?;
    if column.scale() != MONEY_SCALE {
        return Err(EvalError::InvalidDataset(format!(
            "{file}: column '{name}' has scale {} (expected {MONEY_SCALE})",
            column.scale()
        )));
    }
    Ok(column)
}

/// Total nulls across every column of a batch.
pub(crate) fn null_count(batch: &RecordBatch) -> usize {
    batch.columns().iter().map(|column| column.null_count()).sum()
}
