use std::path::{Path, PathBuf};

use crate::schema::{Dimension, SALES};

pub const FILE_EXTENSION: &str = "parquet";
pub const MANIFEST_FILE: &str = "_manifest.json";
pub const REPORT_FILE: &str = "generation_report.json";

/// Directory-based layout of a generated dataset.
///
/// ```text
/// <base_dir>/
///   dim_clientes.parquet
///   dim_produtos.parquet
///   dim_lojas.parquet
///   generation_report.json
///   fato_vendas/
///     _manifest.json
///     fato_vendas_chunk_0000.parquet
///     year=2021/month=03/fato_vendas_chunk_0000.parquet   (hive layout)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    base_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn dimension_path(&self, dimension: Dimension) -> PathBuf {
        self.base_dir
            .join(format!("{}.{FILE_EXTENSION}", dimension.table_name()))
    }

    pub fn fact_dir(&self) -> PathBuf {
        self.base_dir.join(SALES.name)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.fact_dir().join(MANIFEST_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.base_dir.join(REPORT_FILE)
    }

    /// Zero-padded chunk file name; indices past 9999 simply grow wider.
    pub fn chunk_file_name(index: u64) -> String {
        format!("{}_chunk_{index:04}.{FILE_EXTENSION}", SALES.name)
    }

    pub fn chunk_path(&self, index: u64) -> PathBuf {
        self.fact_dir().join(Self::chunk_file_name(index))
    }

    pub fn partition_dir(&self, year: i32, month: u32) -> PathBuf {
        self.fact_dir()
            .join(format!("year={year}"))
            .join(format!("month={month:02}"))
    }

    pub fn partitioned_chunk_path(&self, year: i32, month: u32, index: u64) -> PathBuf {
        self.partition_dir(year, month)
            .join(Self::chunk_file_name(index))
    }

    /// Parse the chunk index out of a chunk file name.
    pub fn parse_chunk_index(file_name: &str) -> Option<u64> {
        let stem = file_name.strip_suffix(&format!(".{FILE_EXTENSION}"))?;
        let index = stem.strip_prefix(&format!("{}_chunk_", SALES.name))?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        index.parse().ok()
    }
}
