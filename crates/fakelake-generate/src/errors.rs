use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Underlying cause of a failed read or write.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parquet(#[from] ParquetError),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors emitted by the generation engine. None of them are retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] fakelake_core::Error),
    #[error("failed to write {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
    #[error("failed to read {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
    #[error("dimension table '{table}' not found at {}; generate dimensions first", path.display())]
    MissingDimension { table: String, path: PathBuf },
    #[error("dimension table '{table}' has an unexpected shape: {reason}")]
    InvalidDimension { table: String, reason: String },
    #[error("dimension table '{table}' has no rows")]
    EmptyDimension { table: String },
    #[error("product {product_id} has no unit price in the lookup")]
    ReferentialIntegrity { product_id: i64 },
    #[error("fact manifest does not match this run: {0}")]
    ManifestMismatch(String),
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("invalid quantity distribution: {0}")]
    Distribution(#[from] rand_distr::ExpError),
    #[error("generation panicked: {0}")]
    Panicked(String),
}

impl GenerationError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<StorageError>) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: impl Into<StorageError>) -> Self {
        Self::StorageRead {
            path: path.into(),
            source: source.into(),
        }
    }
}
